use core::fmt;

use crate::bits::BitsAllocator;
use crate::time::format_seconds;
use crate::Result;

/// Represents a unique id generator.
pub trait UidGenerator {
    /// Issues one unique ID.
    fn get_uid(&self) -> Result<i64>;

    /// Parses a UID back into the elements it was generated from.
    fn parse_uid(&self, uid: i64) -> ParsedUid;
}

/// Diagnostic breakdown of a packed UID.
///
/// `timestamp` is the configured epoch plus the delta-seconds field, rendered
/// as `YYYY-MM-DD HH:MM:SS` in UTC. Remember that the cached path borrows
/// seconds from the future, so this is bookkeeping, not a wall-clock reading.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsedUid {
    pub uid: i64,
    /// 64-character binary rendering of the packed value.
    pub binary: String,
    pub timestamp: String,
    pub worker_id: i64,
    pub sequence: i64,
}

impl ParsedUid {
    pub(crate) fn new(allocator: &BitsAllocator, epoch_seconds: i64, uid: i64) -> Self {
        let (delta_seconds, worker_id, sequence) = allocator.parse(uid);
        Self {
            uid,
            binary: format!("{uid:064b}"),
            timestamp: format_seconds(epoch_seconds + delta_seconds),
            worker_id,
            sequence,
        }
    }
}

impl fmt::Display for ParsedUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\"uid\":\"{}\",\"binary\":\"{}\",\"timestamp\":\"{}\",\"workerId\":\"{}\",\"sequence\":\"{}\"}}",
            self.uid, self.binary, self.timestamp, self.worker_id, self.sequence
        )
    }
}
