use core::fmt;
use core::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::sync::OnceLock;

use crossbeam_utils::CachePadded;
use parking_lot::Mutex;

use crate::buffer::handler::{RejectedPutBufferHandler, RejectedTakeBufferHandler};
use crate::{Error, Result};

/// Sequence value both cursors start from.
pub(crate) const START_POINT: i64 = -1;

const CAN_PUT_FLAG: u8 = 0;
const CAN_TAKE_FLAG: u8 = 1;

/// Capability the ring uses to request an asynchronous refill.
///
/// A single nullary method, supplied by the padding executor during wiring.
/// Holding only this capability keeps the ring from owning the executor (and
/// vice versa) while still letting `take` kick off a refill when occupancy
/// drops under the threshold.
pub trait PaddingTrigger: Send + Sync {
    /// Requests one asynchronous refill.
    fn trigger_padding(&self);
}

impl<F> PaddingTrigger for F
where
    F: Fn() + Send + Sync,
{
    fn trigger_padding(&self) {
        self();
    }
}

/// Lock-free ring of pre-manufactured UIDs.
///
/// Two parallel arrays back the ring: `slots` holds the identifiers and
/// `flags` the per-slot state. A slot's value is only meaningful while its
/// flag is in the takeable state. The producer publishes slots behind a
/// mutex; consumers race on an atomic cursor and never block.
///
/// `tail` is the sequence of the last slot produced, `cursor` the sequence of
/// the last slot consumed. Both advance monotonically from the `-1` start
/// point and are never wrapped: the slot index is `sequence & (size - 1)`, so
/// distance arithmetic like `tail - cursor` stays valid across laps.
///
/// `tail`, `cursor` and every flag are cache-line padded so producer and
/// consumer traffic never invalidate each other's lines. The slot values
/// themselves are left unpadded; they are guarded by the flag handshake:
/// written only while the flag shows puttable, read only while it shows
/// takeable, with release/acquire pairing on the flag transitions.
pub struct RingBuffer {
    buffer_size: usize,
    index_mask: i64,
    slots: Box<[AtomicI64]>,
    flags: Box<[CachePadded<AtomicU8>]>,
    /// Last position sequence to produce.
    tail: CachePadded<AtomicI64>,
    /// Current position sequence to consume.
    cursor: CachePadded<AtomicI64>,
    /// Remaining-UID count under which a refill is requested.
    padding_threshold: i64,
    rejected_put_handler: Box<dyn RejectedPutBufferHandler>,
    rejected_take_handler: Box<dyn RejectedTakeBufferHandler>,
    padding_trigger: OnceLock<Box<dyn PaddingTrigger>>,
    /// Serializes producers: the slot write, flag publish and tail advance of
    /// one `put` are atomic with respect to any other producer.
    put_lock: Mutex<()>,
}

impl RingBuffer {
    /// Builds a ring of `buffer_size` slots, all initially puttable.
    ///
    /// `buffer_size` is derived upstream as `(max_sequence + 1) << boost` and
    /// is therefore always a positive power of two; `padding_factor` is a
    /// percent already validated to lie in `(0, 100)`.
    pub(crate) fn new(
        buffer_size: usize,
        padding_factor: u32,
        rejected_put_handler: Box<dyn RejectedPutBufferHandler>,
        rejected_take_handler: Box<dyn RejectedTakeBufferHandler>,
    ) -> Self {
        debug_assert!(buffer_size.is_power_of_two());
        debug_assert!((1..100).contains(&padding_factor));

        let slots = (0..buffer_size)
            .map(|_| AtomicI64::new(0))
            .collect::<Box<[_]>>();
        let flags = (0..buffer_size)
            .map(|_| CachePadded::new(AtomicU8::new(CAN_PUT_FLAG)))
            .collect::<Box<[_]>>();

        Self {
            buffer_size,
            index_mask: buffer_size as i64 - 1,
            slots,
            flags,
            tail: CachePadded::new(AtomicI64::new(START_POINT)),
            cursor: CachePadded::new(AtomicI64::new(START_POINT)),
            padding_threshold: (buffer_size as i64) * i64::from(padding_factor) / 100,
            rejected_put_handler,
            rejected_take_handler,
            padding_trigger: OnceLock::new(),
            put_lock: Mutex::new(()),
        }
    }

    /// Installs the refill capability. Only the first install takes effect.
    pub(crate) fn set_padding_trigger(&self, trigger: Box<dyn PaddingTrigger>) {
        let _ = self.padding_trigger.set(trigger);
    }

    /// Puts a UID into the slot after the current tail.
    ///
    /// Returns `false` when the ring is full or the next slot has not been
    /// consumed yet; the rejected-put handler runs before returning. The
    /// producer mutex makes the slot write, flag publish and tail advance one
    /// atomic step as far as other producers are concerned; the store-release
    /// of `tail` is what publishes the slot to consumers.
    pub fn put(&self, uid: i64) -> bool {
        let _guard = self.put_lock.lock();

        let current_tail = self.tail.load(Ordering::Relaxed);
        // The start sentinel counts as zero for distance math.
        let current_cursor = self.cursor.load(Ordering::Acquire).max(0);

        // Tail caught the cursor: the ring is full.
        if current_tail - current_cursor == self.buffer_size as i64 - 1 {
            self.rejected_put_handler.reject_put_buffer(self, uid);
            return false;
        }

        let next_tail_index = self.slot_index(current_tail + 1);
        if self.flags[next_tail_index].load(Ordering::Acquire) != CAN_PUT_FLAG {
            self.rejected_put_handler.reject_put_buffer(self, uid);
            return false;
        }

        self.slots[next_tail_index].store(uid, Ordering::Relaxed);
        self.flags[next_tail_index].store(CAN_TAKE_FLAG, Ordering::Release);
        self.tail.store(current_tail + 1, Ordering::Release);
        true
    }

    /// Takes the UID at the next cursor position. Lock free.
    ///
    /// Crossing the padding threshold fires the installed trigger whether or
    /// not this take succeeds; an empty ring is exactly the state a refill
    /// fixes.
    ///
    /// # Errors
    ///
    /// - [`Error::NoAvailable`] when the cursor has caught the tail; the
    ///   rejected-take handler runs first.
    /// - [`Error::SlotNotReady`] / [`Error::CursorBackwards`] on ring
    ///   invariant violations. These never occur in a correct build and must
    ///   be treated as fatal.
    pub fn take(&self) -> Result<i64> {
        let observed_cursor = self.cursor.load(Ordering::Acquire);

        // Spin for the next available cursor.
        let (previous_cursor, next_cursor) = loop {
            let old = self.cursor.load(Ordering::Acquire);
            let new = if old == self.tail.load(Ordering::Acquire) {
                old
            } else {
                old + 1
            };
            if self
                .cursor
                .compare_exchange(old, new, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break (old, new);
            }
        };

        // Safety check, never occurs: a successful exchange only moves the
        // cursor forward by at most one.
        if next_cursor < observed_cursor {
            return Err(Error::CursorBackwards);
        }

        // Trigger padding in async mode once the threshold is reached.
        let current_tail = self.tail.load(Ordering::Acquire);
        if current_tail - next_cursor < self.padding_threshold {
            if let Some(trigger) = self.padding_trigger.get() {
                trigger.trigger_padding();
            }
        }

        // Cursor caught the tail: no available UID to take at this moment.
        if next_cursor == previous_cursor {
            self.rejected_take_handler.reject_take_buffer(self);
            return Err(Error::NoAvailable);
        }

        let next_cursor_index = self.slot_index(next_cursor);
        if self.flags[next_cursor_index].load(Ordering::Acquire) != CAN_TAKE_FLAG {
            return Err(Error::SlotNotReady);
        }

        // The slot read must precede the flag release. Flipping the flag
        // first would let a producer one lap ahead overwrite the slot before
        // the value is out, handing the same UID to two consumers.
        let uid = self.slots[next_cursor_index].load(Ordering::Relaxed);
        self.flags[next_cursor_index].store(CAN_PUT_FLAG, Ordering::Release);
        Ok(uid)
    }

    /// Slot index for a sequence: `sequence & (buffer_size - 1)`, valid
    /// because the size is a power of two.
    fn slot_index(&self, sequence: i64) -> usize {
        (sequence & self.index_mask) as usize
    }

    /// Number of slots in the ring.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Sequence of the last produced slot.
    pub fn tail(&self) -> i64 {
        self.tail.load(Ordering::Acquire)
    }

    /// Sequence of the last consumed slot.
    pub fn cursor(&self) -> i64 {
        self.cursor.load(Ordering::Acquire)
    }

    /// Remaining-UID count under which `take` requests a refill.
    pub fn padding_threshold(&self) -> i64 {
        self.padding_threshold
    }
}

impl fmt::Display for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ring buffer [buffer_size={}, tail={}, cursor={}, padding_threshold={}]",
            self.buffer_size,
            self.tail.load(Ordering::Relaxed),
            self.cursor.load(Ordering::Relaxed),
            self.padding_threshold
        )
    }
}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("buffer_size", &self.buffer_size)
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .field("padding_threshold", &self.padding_threshold)
            .finish_non_exhaustive()
    }
}
