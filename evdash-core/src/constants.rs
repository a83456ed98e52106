/// Collection key used when none is configured.
pub const DEFAULT_COLLECTION: &str = "events";

/// How often a remote subscription re-reads the collection.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
