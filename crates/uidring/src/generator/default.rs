use core::cell::Cell;

use crate::bits::BitsAllocator;
use crate::generator::interface::{ParsedUid, UidGenerator};
use crate::generator::resolve_worker_id;
use crate::time::{parse_epoch, SystemClock, TimeSource, DEFAULT_EPOCH};
use crate::worker::WorkerIdAssigner;
use crate::{Error, Result};

/// Direct second-by-second UID issuer.
///
/// Issues one UID per call against the live clock: same second increments
/// the sequence, a fresh second resets it, an exhausted second spin-waits for
/// the clock to advance, and a clock running backwards is refused.
///
/// State lives in [`Cell`]s, so this generator is deliberately `!Sync`: it is
/// the single-threaded fallback and the semantic template for the cached
/// path. Use [`CachedUidGenerator`] for concurrent issuance.
///
/// # Example
///
/// ```
/// use uidring::{DefaultUidGenerator, FixedWorkerIdAssigner, UidGenerator};
///
/// let generator = DefaultUidGenerator::builder()
///     .build(&FixedWorkerIdAssigner::new(1))
///     .unwrap();
/// let uid = generator.get_uid().unwrap();
/// assert_eq!(generator.parse_uid(uid).worker_id, 1);
/// ```
///
/// [`CachedUidGenerator`]: crate::CachedUidGenerator
pub struct DefaultUidGenerator<T = SystemClock>
where
    T: TimeSource,
{
    allocator: BitsAllocator,
    epoch_seconds: i64,
    worker_id: i64,
    /// Sequence within `last_second`.
    sequence: Cell<i64>,
    /// Last second an ID was issued for; starts at the -1 sentinel.
    last_second: Cell<i64>,
    clock: T,
}

/// Configuration for [`DefaultUidGenerator`].
#[derive(Debug, Clone)]
pub struct DefaultUidGeneratorBuilder {
    time_bits: u8,
    worker_bits: u8,
    seq_bits: u8,
    epoch: String,
}

impl Default for DefaultUidGeneratorBuilder {
    fn default() -> Self {
        Self {
            time_bits: 28,
            worker_bits: 22,
            seq_bits: 13,
            epoch: DEFAULT_EPOCH.to_owned(),
        }
    }
}

impl DefaultUidGeneratorBuilder {
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

    /// Builds against the system wall clock.
    pub fn build<A>(self, assigner: &A) -> Result<DefaultUidGenerator>
    where
        A: WorkerIdAssigner + ?Sized,
    {
        self.build_with_clock(assigner, SystemClock)
    }

    /// Builds with an injected clock.
    ///
    /// # Errors
    ///
    /// [`Error::BitLayoutInvalid`], [`Error::EpochInvalid`] or
    /// [`Error::WorkerIdOverflow`] on bad configuration.
    pub fn build_with_clock<A, T>(self, assigner: &A, clock: T) -> Result<DefaultUidGenerator<T>>
    where
        A: WorkerIdAssigner + ?Sized,
        T: TimeSource,
    {
        let allocator = BitsAllocator::new(self.time_bits, self.worker_bits, self.seq_bits)?;
        let epoch_seconds = parse_epoch(&self.epoch)?;
        let worker_id = resolve_worker_id(assigner, &allocator)?;

        Ok(DefaultUidGenerator {
            allocator,
            epoch_seconds,
            worker_id,
            sequence: Cell::new(0),
            last_second: Cell::new(-1),
            clock,
        })
    }
}

impl DefaultUidGenerator<SystemClock> {
    pub fn builder() -> DefaultUidGeneratorBuilder {
        DefaultUidGeneratorBuilder::default()
    }
}

impl<T> DefaultUidGenerator<T>
where
    T: TimeSource,
{
    fn next_id(&self) -> Result<i64> {
        let mut current_second = self.clock.unix_seconds();
        let last_second = self.last_second.get();

        // Clock moved backwards, refuse to generate.
        if current_second < last_second {
            return Err(Error::ClockBackwards {
                refused_seconds: last_second - current_second,
            });
        }

        if current_second == last_second {
            let sequence = (self.sequence.get() + 1) & self.allocator.max_sequence();
            self.sequence.set(sequence);
            // The second is exhausted: wait for the next one.
            if sequence == 0 {
                current_second = self.next_second(last_second)?;
            }
        } else {
            // A fresh second restarts the sequence from zero.
            self.sequence.set(0);
        }
        self.last_second.set(current_second);

        let delta_seconds = current_second - self.epoch_seconds;
        if delta_seconds > self.allocator.max_delta_seconds() {
            return Err(Error::TimestampExhausted {
                now: current_second,
            });
        }

        Ok(self
            .allocator
            .allocate(delta_seconds, self.worker_id, self.sequence.get()))
    }

    /// Spin-waits until the clock passes `last_second`.
    fn next_second(&self, last_second: i64) -> Result<i64> {
        let mut timestamp = self.current_second()?;
        while timestamp <= last_second {
            core::hint::spin_loop();
            timestamp = self.current_second()?;
        }
        Ok(timestamp)
    }

    fn current_second(&self) -> Result<i64> {
        let current_second = self.clock.unix_seconds();
        if current_second - self.epoch_seconds > self.allocator.max_delta_seconds() {
            return Err(Error::TimestampExhausted {
                now: current_second,
            });
        }
        Ok(current_second)
    }

    pub fn worker_id(&self) -> i64 {
        self.worker_id
    }
}

impl<T> UidGenerator for DefaultUidGenerator<T>
where
    T: TimeSource,
{
    fn get_uid(&self) -> Result<i64> {
        self.next_id()
    }

    fn parse_uid(&self, uid: i64) -> ParsedUid {
        ParsedUid::new(&self.allocator, self.epoch_seconds, uid)
    }
}
