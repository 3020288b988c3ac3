use core::time::Duration;
use std::sync::Arc;

use crate::bits::BitsAllocator;
use crate::buffer::{
    BufferPaddingExecutor, DiscardPutBufferHandler, ErrorTakeBufferHandler, RejectedPutBufferHandler,
    RejectedTakeBufferHandler, RingBuffer, SecondBatchProvider,
};
use crate::generator::interface::{ParsedUid, UidGenerator};
use crate::generator::resolve_worker_id;
use crate::time::{parse_epoch, SystemClock, TimeSource, DEFAULT_EPOCH};
use crate::worker::WorkerIdAssigner;
use crate::{Error, Result};

const DEFAULT_BOOST_POWER: u8 = 3;
const DEFAULT_PADDING_FACTOR: u32 = 50;

/// Cached UID issuer over a lock-free ring.
///
/// Construction wires the bit allocator, a per-second batch provider, the
/// ring and the padding executor, performs one synchronous fill, and starts
/// the scheduled refill task when an interval is configured. `get_uid`
/// advances the ring cursor and never waits on a timer: the producer has
/// already borrowed the IDs from future seconds.
///
/// Thread safe; consumers take concurrently and lock free.
///
/// # Example
///
/// ```
/// use uidring::{CachedUidGenerator, FixedWorkerIdAssigner, UidGenerator};
///
/// #[tokio::main(flavor = "multi_thread")]
/// async fn main() -> uidring::Result<()> {
///     let generator = CachedUidGenerator::builder()
///         .boost_power(2)
///         .build(&FixedWorkerIdAssigner::new(7))?;
///
///     let uid = generator.get_uid()?;
///     assert_eq!(generator.parse_uid(uid).worker_id, 7);
///     generator.shutdown();
///     Ok(())
/// }
/// ```
pub struct CachedUidGenerator {
    allocator: BitsAllocator,
    epoch_seconds: i64,
    worker_id: i64,
    ring: Arc<RingBuffer>,
    executor: Arc<BufferPaddingExecutor>,
}

/// Configuration for [`CachedUidGenerator`].
pub struct CachedUidGeneratorBuilder {
    time_bits: u8,
    worker_bits: u8,
    seq_bits: u8,
    epoch: String,
    boost_power: u8,
    padding_factor: u32,
    schedule_interval: Option<u64>,
    rejected_put_handler: Option<Box<dyn RejectedPutBufferHandler>>,
    rejected_take_handler: Option<Box<dyn RejectedTakeBufferHandler>>,
}

impl Default for CachedUidGeneratorBuilder {
    fn default() -> Self {
        Self {
            time_bits: 28,
            worker_bits: 22,
            seq_bits: 13,
            epoch: DEFAULT_EPOCH.to_owned(),
            boost_power: DEFAULT_BOOST_POWER,
            padding_factor: DEFAULT_PADDING_FACTOR,
            schedule_interval: None,
            rejected_put_handler: None,
            rejected_take_handler: None,
        }
    }
}

impl CachedUidGeneratorBuilder {
    /// Overrides the field widths. They must sum to 63.
    pub fn bits(mut self, time_bits: u8, worker_bits: u8, seq_bits: u8) -> Self {
        self.time_bits = time_bits;
        self.worker_bits = worker_bits;
        self.seq_bits = seq_bits;
        self
    }

    /// Overrides the epoch date (`YYYY-MM-DD`).
    pub fn epoch(mut self, epoch: impl Into<String>) -> Self {
        self.epoch = epoch.into();
        self
    }

    /// Ring size boost: the ring holds `(max_sequence + 1) << boost_power`
    /// slots.
    pub fn boost_power(mut self, boost_power: u8) -> Self {
        self.boost_power = boost_power;
        self
    }

    /// Percent of the ring size under which a refill is triggered.
    pub fn padding_factor(mut self, padding_factor: u32) -> Self {
        self.padding_factor = padding_factor;
        self
    }

    /// Enables scheduled refills every `seconds`.
    pub fn schedule_interval(mut self, seconds: u64) -> Self {
        self.schedule_interval = Some(seconds);
        self
    }

    /// Policy for puts refused by a full ring. Default logs and drops.
    pub fn rejected_put_handler(mut self, handler: Box<dyn RejectedPutBufferHandler>) -> Self {
        self.rejected_put_handler = Some(handler);
        self
    }

    /// Policy for takes refused by an empty ring. Default logs and fails.
    pub fn rejected_take_handler(mut self, handler: Box<dyn RejectedTakeBufferHandler>) -> Self {
        self.rejected_take_handler = Some(handler);
        self
    }

    /// Builds against the system wall clock.
    ///
    /// Must be called within a Tokio runtime; refill tasks are spawned onto
    /// the runtime that is current here.
    pub fn build<A>(self, assigner: &A) -> Result<CachedUidGenerator>
    where
        A: WorkerIdAssigner + ?Sized,
    {
        self.build_with_clock(assigner, SystemClock)
    }

    /// Builds with an injected clock, consulted once to seed the producer's
    /// second counter.
    pub fn build_with_clock<A, T>(self, assigner: &A, clock: T) -> Result<CachedUidGenerator>
    where
        A: WorkerIdAssigner + ?Sized,
        T: TimeSource,
    {
        let allocator = BitsAllocator::new(self.time_bits, self.worker_bits, self.seq_bits)?;
        let epoch_seconds = parse_epoch(&self.epoch)?;
        let worker_id = resolve_worker_id(assigner, &allocator)?;

        if !(1..100).contains(&self.padding_factor) {
            return Err(Error::PaddingFactorInvalid {
                factor: self.padding_factor,
            });
        }
        let schedule_interval = match self.schedule_interval {
            Some(0) => return Err(Error::ScheduleIntervalInvalid),
            Some(seconds) => Some(Duration::from_secs(seconds)),
            None => None,
        };

        let buffer_size = ((allocator.max_sequence() + 1) as usize) << self.boost_power;
        let ring = Arc::new(RingBuffer::new(
            buffer_size,
            self.padding_factor,
            self.rejected_put_handler
                .unwrap_or_else(|| Box::new(DiscardPutBufferHandler)),
            self.rejected_take_handler
                .unwrap_or_else(|| Box::new(ErrorTakeBufferHandler)),
        ));
        tracing::info!(
            buffer_size,
            padding_factor = self.padding_factor,
            "initialized ring buffer"
        );

        let provider = SecondBatchProvider::new(allocator, epoch_seconds, worker_id);
        let executor = Arc::new(BufferPaddingExecutor::new(
            Arc::clone(&ring),
            Box::new(provider),
            schedule_interval,
            clock.unix_seconds(),
        )?);

        // The ring holds only a narrow trigger capability backed by a weak
        // reference, so neither side owns the other.
        let trigger = Arc::downgrade(&executor);
        ring.set_padding_trigger(Box::new(move || {
            if let Some(executor) = trigger.upgrade() {
                executor.async_padding();
            }
        }));
        tracing::info!(
            schedule_interval_seconds = self.schedule_interval,
            "initialized buffer padding executor"
        );

        // Fill every slot synchronously, then start the schedule if any.
        executor.padding_buffer();
        Arc::clone(&executor).start();

        Ok(CachedUidGenerator {
            allocator,
            epoch_seconds,
            worker_id,
            ring,
            executor,
        })
    }
}

impl CachedUidGenerator {
    pub fn builder() -> CachedUidGeneratorBuilder {
        CachedUidGeneratorBuilder::default()
    }

    /// Stops scheduled refills. Idempotent; in-flight refills complete.
    pub fn shutdown(&self) {
        self.executor.shutdown();
    }

    pub fn worker_id(&self) -> i64 {
        self.worker_id
    }

    /// The backing ring, exposed for diagnostics.
    pub fn ring(&self) -> &RingBuffer {
        &self.ring
    }

    /// The producer executor, exposed for diagnostics.
    pub fn executor(&self) -> &BufferPaddingExecutor {
        &self.executor
    }
}

impl UidGenerator for CachedUidGenerator {
    fn get_uid(&self) -> Result<i64> {
        self.ring.take()
    }

    fn parse_uid(&self, uid: i64) -> ParsedUid {
        ParsedUid::new(&self.allocator, self.epoch_seconds, uid)
    }
}

impl Drop for CachedUidGenerator {
    fn drop(&mut self) {
        self.executor.shutdown();
    }
}
