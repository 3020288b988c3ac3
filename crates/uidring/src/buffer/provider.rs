use parking_lot::Mutex;

use crate::bits::BitsAllocator;
use crate::{Error, Result};

/// Provides the full run of UIDs for one source second.
///
/// The `moment_in_second` argument is the producer's monotonically advancing
/// counter, not a clock reading: the provider has no notion of "now" and will
/// happily manufacture IDs for seconds that have not elapsed yet. That is the
/// whole point of the cached path.
pub trait BufferedUidProvider: Send + Sync {
    /// Returns exactly `max_sequence + 1` strictly increasing UIDs for the
    /// given second.
    ///
    /// # Errors
    ///
    /// [`Error::TimestampExhausted`] when the second no longer fits the
    /// timestamp field.
    fn provide(&self, moment_in_second: i64) -> Result<Vec<i64>>;

    /// Returns a drained batch buffer to the provider's pool.
    fn recycle(&self, batch: Vec<i64>);
}

/// Default provider: allocates the first sequence of the second and derives
/// the rest by offset, which is valid because the sequence field occupies the
/// lowest bits.
///
/// A small pool of batch buffers amortises allocation across refills. The
/// pool never holds more than a couple of entries in practice since refills
/// are serialized upstream.
pub struct SecondBatchProvider {
    batch_len: usize,
    pool: Mutex<Vec<Vec<i64>>>,
    allocator: BitsAllocator,
    epoch_seconds: i64,
    worker_id: i64,
}

impl SecondBatchProvider {
    pub fn new(allocator: BitsAllocator, epoch_seconds: i64, worker_id: i64) -> Self {
        Self {
            batch_len: (allocator.max_sequence() + 1) as usize,
            pool: Mutex::new(Vec::new()),
            allocator,
            epoch_seconds,
            worker_id,
        }
    }
}

impl BufferedUidProvider for SecondBatchProvider {
    fn provide(&self, moment_in_second: i64) -> Result<Vec<i64>> {
        let delta_seconds = moment_in_second - self.epoch_seconds;
        if delta_seconds > self.allocator.max_delta_seconds() {
            return Err(Error::TimestampExhausted {
                now: moment_in_second,
            });
        }

        let mut batch = self.pool.lock().pop().unwrap_or_default();
        batch.clear();
        batch.reserve(self.batch_len);

        let first = self.allocator.allocate(delta_seconds, self.worker_id, 0);
        batch.extend((0..self.batch_len as i64).map(|offset| first + offset));
        Ok(batch)
    }

    fn recycle(&self, batch: Vec<i64>) {
        self.pool.lock().push(batch);
    }
}
