//! Per-client rate limits, keyed on the client IP
//!
//! `per_second(n)` in the governor builder is the replenish interval: one
//! more request is allowed every `n` seconds once the burst is spent.

/// Generation is the only costly endpoint: a burst of 10, then one every 6 seconds
pub const GENERATE_REPLENISH_SECONDS: u64 = 6;
pub const GENERATE_BURST_SIZE: u32 = 10;

/// Build a `GovernorLayer` keyed on the client IP (`X-Forwarded-For`,
/// `X-Real-IP`, `Forwarded`, then the peer address)
#[macro_export]
macro_rules! make_rate_limit_layer {
    ($replenish_seconds:expr, $burst_size:expr) => {{
        let config = ::tower_governor::governor::GovernorConfigBuilder::default()
            .per_second($replenish_seconds)
            .burst_size($burst_size)
            .key_extractor(::tower_governor::key_extractor::SmartIpKeyExtractor)
            .use_headers()
            .finish()
            .expect("rate limit parameters are non-zero");
        ::tower_governor::GovernorLayer::new(config)
    }};
}
