use std::num::NonZeroU32;
use std::time::Duration;

use governor::Quota;

/// Slowest replenish rate a quota is built with
const MAX_REPLENISH_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Builds a governor quota admitting `qps` cells per second with bursts of
/// up to `burst`.
///
/// Fractional rates are kept: `qps = 0.5` replenishes one cell every two
/// seconds. Rates too small to represent are clamped to one cell per day.
pub(crate) fn quota(
    qps: f64,
    burst: u32,
) -> Quota {
    let period = Duration::try_from_secs_f64(qps.recip())
        .unwrap_or(MAX_REPLENISH_PERIOD)
        .clamp(Duration::from_nanos(1), MAX_REPLENISH_PERIOD);
    let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
        .allow_burst(burst)
}
