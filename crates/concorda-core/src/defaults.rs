//! Default configuration values shared across concorda crates.

/// Default HTTP listen port.
pub const APP_PORT: u16 = 8080;

/// Deadline for a single admin/read HTTP request (milliseconds).
pub const REQUEST_TIMEOUT_MS: u64 = 4500;

/// Deadline for one full pipeline run of a queue notification (milliseconds).
pub const PROCESS_TIMEOUT_MS: u64 = 60_000;

/// Maximum number of messages pulled from the queue per poll.
pub const MESSAGES_TO_PROCESS: usize = 10;

/// Queue visibility timeout before an unacked message is redelivered (seconds).
pub const VISIBILITY_TIMEOUT_S: u32 = 60;

/// Queue long-poll wait time (seconds).
pub const WAIT_TIME_S: u32 = 20;

/// Pause between poll attempts while the health gate is down (milliseconds).
pub const UNHEALTHY_BACKOFF_MS: u64 = 200;

/// Interval between health-gate evaluations (seconds).
pub const HEALTH_CHECK_INTERVAL_S: u64 = 10;

/// Bound on concurrent source fetches within one pipeline run.
pub const SOURCE_FETCH_CONCURRENCY: usize = 8;

/// HTTP connect timeout for outgoing calls (seconds).
pub const HTTP_CONNECT_TIMEOUT_S: u64 = 10;

/// Canonical types whose URLs are surfaced to public readers and therefore
/// need extra cache-purge keys.
pub const PUBLIC_ENDPOINT_TYPES: [&str; 4] = ["Person", "Brand", "Organisation", "PublicCompany"];

/// Synthesized type for concordance entries whose source is missing from the
/// blob store.
pub const THING_TYPE: &str = "Thing";
