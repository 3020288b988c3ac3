use core::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use core::time::Duration;
use std::sync::Arc;

use crossbeam_utils::CachePadded;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::buffer::provider::BufferedUidProvider;
use crate::buffer::ring::RingBuffer;
use crate::{Error, Result};

/// Producer side of the cached path.
///
/// Owns `last_second`, the "borrow from the future" counter: seeded from the
/// wall clock once at construction and advanced monotonically by the producer
/// from then on, independent of wall-clock. Each refill batch carries one
/// full second of UIDs, so the ring always holds contiguous per-second runs
/// and `last_second` never repeats a value. Worker id plus sequence make each
/// UID unique within a second, so uniqueness holds whether the counter runs
/// ahead of or behind the actual clock.
pub struct BufferPaddingExecutor {
    /// Whether a refill is currently running.
    running: AtomicBool,
    /// Last second whose UIDs were emitted into the ring.
    last_second: CachePadded<AtomicI64>,
    ring: Arc<RingBuffer>,
    provider: Box<dyn BufferedUidProvider>,
    /// Scheduled refill period; `None` leaves refills purely on demand.
    schedule_interval: Option<Duration>,
    handle: Handle,
    shutdown: CancellationToken,
}

impl BufferPaddingExecutor {
    /// Builds the executor around a ring and a provider.
    ///
    /// `seed_second` is the wall-clock second at construction; it is the only
    /// time the clock is consulted.
    ///
    /// # Errors
    ///
    /// [`Error::RuntimeUnavailable`] when no Tokio runtime is in scope to
    /// spawn refill tasks onto.
    pub(crate) fn new(
        ring: Arc<RingBuffer>,
        provider: Box<dyn BufferedUidProvider>,
        schedule_interval: Option<Duration>,
        seed_second: i64,
    ) -> Result<Self> {
        let handle = Handle::try_current().map_err(|_| Error::RuntimeUnavailable)?;
        Ok(Self {
            running: AtomicBool::new(false),
            last_second: CachePadded::new(AtomicI64::new(seed_second)),
            ring,
            provider,
            schedule_interval,
            handle,
            shutdown: CancellationToken::new(),
        })
    }

    /// Fills the ring until a put is refused (ring full) or the provider
    /// fails.
    ///
    /// At most one refill runs at a time. A call that loses the `running`
    /// gate returns immediately: the in-flight refill is already writing the
    /// slots this caller would have written.
    pub fn padding_buffer(&self) {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::trace!("padding buffer is still running");
            return;
        }

        let mut ring_full = false;
        while !ring_full {
            let second = self.last_second.fetch_add(1, Ordering::AcqRel) + 1;
            let batch = match self.provider.provide(second) {
                Ok(batch) => batch,
                Err(error) => {
                    tracing::error!(second, %error, "uid provider failed, stopping refill");
                    break;
                }
            };
            for &uid in &batch {
                if !self.ring.put(uid) {
                    ring_full = true;
                    break;
                }
            }
            self.provider.recycle(batch);
        }

        self.running.store(false, Ordering::Release);
        tracing::trace!(
            last_second = self.last_second(),
            ring = %self.ring,
            "padding buffer finished"
        );
    }

    /// Fire-and-forget refill on the runtime captured at construction.
    ///
    /// No-op once shutdown has been signalled.
    pub fn async_padding(self: Arc<Self>) {
        if self.shutdown.is_cancelled() {
            return;
        }
        let handle = self.handle.clone();
        handle.spawn(async move { self.padding_buffer() });
    }

    /// Starts the scheduled refill task when an interval is configured.
    ///
    /// The task holds only a weak reference, so dropping the generator stops
    /// it just as well as an explicit shutdown does.
    pub(crate) fn start(self: Arc<Self>) {
        let Some(period) = self.schedule_interval else {
            return;
        };

        let executor = Arc::downgrade(&self);
        let shutdown = self.shutdown.clone();
        self.handle.spawn(async move {
            let first_tick = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(first_tick, period);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(executor) = executor.upgrade() else { break };
                        executor.padding_buffer();
                    }
                }
            }
            tracing::debug!("scheduled padding task stopped");
        });
    }

    /// Signals the scheduled task to stop and refuses new async refills.
    ///
    /// Idempotent. An in-flight refill runs to completion.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Last second whose UIDs were emitted into the ring.
    pub fn last_second(&self) -> i64 {
        self.last_second.load(Ordering::Acquire)
    }
}
