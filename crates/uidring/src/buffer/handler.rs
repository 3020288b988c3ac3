use crate::buffer::ring::RingBuffer;

/// Policy applied when a `put` is refused.
///
/// Handlers run synchronously inside the rejecting call and must not block;
/// the producer mutex is still held when the put handler fires.
pub trait RejectedPutBufferHandler: Send + Sync {
    fn reject_put_buffer(&self, ring: &RingBuffer, uid: i64);
}

/// Policy applied when a `take` finds the ring empty.
///
/// Runs synchronously in the consumer's call before the take fails.
pub trait RejectedTakeBufferHandler: Send + Sync {
    fn reject_take_buffer(&self, ring: &RingBuffer);
}

/// Default put policy: log and drop the UID.
///
/// Dropping is safe: a refused put ends the current refill, and the dropped
/// value was never published, so no slot is lost and no duplicate can appear.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardPutBufferHandler;

impl RejectedPutBufferHandler for DiscardPutBufferHandler {
    fn reject_put_buffer(&self, ring: &RingBuffer, uid: i64) {
        tracing::warn!(uid, %ring, "rejected putting buffer");
    }
}

/// Default take policy: log; the take itself fails with
/// [`Error::NoAvailable`](crate::Error::NoAvailable).
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorTakeBufferHandler;

impl RejectedTakeBufferHandler for ErrorTakeBufferHandler {
    fn reject_take_buffer(&self, ring: &RingBuffer) {
        tracing::warn!(%ring, "rejected take buffer");
    }
}
