pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for UID generation.
///
/// Construction-time variants (`BitLayoutInvalid`, `WorkerIdOverflow`,
/// configuration errors) are fatal to the caller assembling a generator.
/// Issuance-time variants are returned per call. `SlotNotReady` and
/// `CursorBackwards` signal a broken ring invariant and must not be retried.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Sign, timestamp, worker and sequence widths must cover exactly 64 bits.
    #[error("bit layout 1+{time_bits}+{worker_bits}+{seq_bits} does not allocate exactly 64 bits")]
    BitLayoutInvalid {
        time_bits: u8,
        worker_bits: u8,
        seq_bits: u8,
    },

    /// The assigned worker id does not fit the configured worker field.
    #[error("worker id {worker_id} exceeds the max {max_worker_id}")]
    WorkerIdOverflow { worker_id: i64, max_worker_id: i64 },

    /// The configured epoch string is not a `YYYY-MM-DD` date.
    #[error("epoch `{epoch}` is not a valid YYYY-MM-DD date")]
    EpochInvalid { epoch: String },

    /// The padding factor must be a percentage strictly between 0 and 100.
    #[error("padding factor {factor} must lie in (0, 100)")]
    PaddingFactorInvalid { factor: u32 },

    /// A configured schedule interval must be positive.
    #[error("schedule interval must be positive")]
    ScheduleIntervalInvalid,

    /// The cached path spawns refill tasks and needs a Tokio runtime in scope
    /// at construction.
    #[error("cached UID generation requires a running Tokio runtime")]
    RuntimeUnavailable,

    /// The wall clock went backwards past the last issued second.
    #[error("clock moved backwards, refusing for {refused_seconds} seconds")]
    ClockBackwards { refused_seconds: i64 },

    /// The delta-seconds field can no longer represent the requested second.
    /// Terminal for this worker under the configured epoch and layout.
    #[error("timestamp bits exhausted, refusing UID generation at second {now}")]
    TimestampExhausted { now: i64 },

    /// The ring held no takeable slot at the moment of the call.
    #[error("too frequent acquisition, no more available UID to take")]
    NoAvailable,

    /// A slot inside the published window was not in a takeable state.
    #[error("cursor not in a takeable status")]
    SlotNotReady,

    /// The consumer cursor was observed moving backwards.
    #[error("cursor can't move back")]
    CursorBackwards,

    /// Host discovery found no usable non-loopback network address.
    #[error("no validated local address")]
    NoLocalAddress,

    /// Only one of the container host/port variables was set.
    #[error("missing host or port from the container environment")]
    ContainerEnvIncomplete,
}
