//! Result codes crossing the C ABI.

/// Outcome of any `sill_host_*` call that returns `int32_t`.
///
/// Zero is success and everything else is the first thing that went wrong;
/// the header mirrors these values as `SILL_HOST_*` constants.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostResult {
    Ok = 0,
    /// The bridge handle is not in the handle table.
    InvalidHandle = 1,
    /// A required argument was null, not valid UTF-8, or failed to parse.
    InvalidArgument = 2,
    /// The manager loop is already pumping on another thread.
    AlreadyRunning = 3,
    /// The manager loop has exited and accepts no further work.
    Stopped = 4,
    /// Anything else; details go to the `tracing` log.
    Internal = 5,
}
