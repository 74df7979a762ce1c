//! Default tuning values.

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE
// ═══════════════════════════════════════════════════════════════════════════════

/// Nominal time-to-live of a cached outcome, in seconds.
pub const DEFAULT_TTL_SECONDS: u64 = 60;

/// Age after which an entry is evicted outright, in seconds (2x TTL).
pub const DEFAULT_KEEP_ALIVE_SECONDS: u64 = 2 * DEFAULT_TTL_SECONDS;

/// Maximum number of entries held by one cache.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Interval of the background eviction sweep, in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 30;

// ═══════════════════════════════════════════════════════════════════════════════
// STREAMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Buffered outcomes per subscriber before a slow subscriber starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

// ═══════════════════════════════════════════════════════════════════════════════
// GITHUB
// ═══════════════════════════════════════════════════════════════════════════════

/// Public GitHub REST endpoint.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// HTTP request timeout, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

/// User agent sent with every request (GitHub rejects requests without one).
pub const DEFAULT_USER_AGENT: &str = concat!("repowatch/", env!("CARGO_PKG_VERSION"));
