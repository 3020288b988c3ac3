//! # uidring
//!
//! High-throughput unique 64-bit identifiers for distributed storage keys,
//! packed from three fields so that IDs are roughly time-ordered across a
//! fleet and unique without coordination at issuance time:
//!
//! ```text
//! +------+----------------------+----------------+-----------+
//! | sign |     delta seconds    | worker node id | sequence  |
//! +------+----------------------+----------------+-----------+
//!   1bit          28bits              22bits         13bits
//! ```
//!
//! The defaults above support about 8.5 years of delta seconds past the
//! `2023-05-20` epoch, ~4.2M worker ids and 8192 IDs per worker per second.
//! All three widths are configurable as long as they cover the 63 bits under
//! the sign.
//!
//! Two issuers are provided:
//!
//! - [`DefaultUidGenerator`]: direct issuance against the live clock, with
//!   clock-backwards detection. Single-threaded.
//! - [`CachedUidGenerator`]: the high-throughput path. A background producer
//!   "borrows from the future" — it manufactures whole seconds of IDs for a
//!   monotonically advancing second counter, regardless of wall-clock — and
//!   publishes them into a lock-free ring that concurrent consumers drain.
//!   Crossing a low-water mark triggers an asynchronous refill, so consumers
//!   never wait on a timer.
//!
//! The trade is deliberate: the timestamp field becomes bookkeeping rather
//! than a clock reading, in exchange for issuance that is one atomic
//! compare-and-swap per ID.
//!
//! ## Example
//!
//! ```
//! use uidring::{CachedUidGenerator, FixedWorkerIdAssigner, UidGenerator};
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> uidring::Result<()> {
//!     let generator = CachedUidGenerator::builder()
//!         .boost_power(2)
//!         .padding_factor(50)
//!         .build(&FixedWorkerIdAssigner::new(1))?;
//!
//!     let uid = generator.get_uid()?;
//!     println!("{}", generator.parse_uid(uid));
//!     generator.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! Production deployments implement [`WorkerIdAssigner`] against a durable
//! store keyed by [`WorkerNode`] identity; see the `worker` types for the
//! disposable-registry contract.

mod bits;
mod buffer;
mod error;
mod generator;
mod time;
mod worker;

pub use crate::bits::*;
pub use crate::buffer::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::time::*;
pub use crate::worker::*;
