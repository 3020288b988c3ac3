use crate::{Error, Result};

/// Total width of a packed UID.
const TOTAL_BITS: u32 = 64;
/// The highest bit is reserved for sign and is always zero.
const SIGN_BITS: u32 = 1;

/// Stateless bit-layout configuration for packed UIDs.
///
/// A UID splits 63 bits between three fields, most significant first:
///
/// ```text
/// +------+----------------------+----------------+-----------+
/// | sign |     delta seconds    | worker node id | sequence  |
/// +------+----------------------+----------------+-----------+
///   1bit        time_bits          worker_bits     seq_bits
/// ```
///
/// Construction fails unless the widths cover exactly 64 bits. Packing does
/// not validate field ranges; the issuance paths guarantee each field fits
/// its width before calling [`allocate`](Self::allocate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitsAllocator {
    time_bits: u8,
    worker_bits: u8,
    seq_bits: u8,
    max_delta_seconds: i64,
    max_worker_id: i64,
    max_sequence: i64,
    timestamp_shift: u8,
    worker_id_shift: u8,
}

impl BitsAllocator {
    /// Builds an allocator from the three field widths.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BitLayoutInvalid`] when
    /// `1 + time_bits + worker_bits + seq_bits != 64`.
    pub fn new(time_bits: u8, worker_bits: u8, seq_bits: u8) -> Result<Self> {
        let total =
            SIGN_BITS + u32::from(time_bits) + u32::from(worker_bits) + u32::from(seq_bits);
        if total != TOTAL_BITS {
            return Err(Error::BitLayoutInvalid {
                time_bits,
                worker_bits,
                seq_bits,
            });
        }

        Ok(Self {
            time_bits,
            worker_bits,
            seq_bits,
            max_delta_seconds: !(-1_i64 << time_bits),
            max_worker_id: !(-1_i64 << worker_bits),
            max_sequence: !(-1_i64 << seq_bits),
            timestamp_shift: worker_bits + seq_bits,
            worker_id_shift: seq_bits,
        })
    }

    /// Packs delta seconds, worker id and sequence into one UID.
    ///
    /// The sign bit stays zero because the caller keeps `delta_seconds`
    /// within [`max_delta_seconds`](Self::max_delta_seconds).
    pub const fn allocate(&self, delta_seconds: i64, worker_id: i64, sequence: i64) -> i64 {
        (delta_seconds << self.timestamp_shift) | (worker_id << self.worker_id_shift) | sequence
    }

    /// Recovers `(delta_seconds, worker_id, sequence)` from a packed UID.
    pub const fn parse(&self, uid: i64) -> (i64, i64, i64) {
        let delta_seconds = (uid >> self.timestamp_shift) & self.max_delta_seconds;
        let worker_id = (uid >> self.worker_id_shift) & self.max_worker_id;
        let sequence = uid & self.max_sequence;
        (delta_seconds, worker_id, sequence)
    }

    pub const fn time_bits(&self) -> u8 {
        self.time_bits
    }

    pub const fn worker_bits(&self) -> u8 {
        self.worker_bits
    }

    pub const fn seq_bits(&self) -> u8 {
        self.seq_bits
    }

    /// Maximum representable delta in seconds since the epoch.
    pub const fn max_delta_seconds(&self) -> i64 {
        self.max_delta_seconds
    }

    /// Maximum representable worker id.
    pub const fn max_worker_id(&self) -> i64 {
        self.max_worker_id
    }

    /// Maximum sequence within one second.
    pub const fn max_sequence(&self) -> i64 {
        self.max_sequence
    }
}
