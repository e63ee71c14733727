//! Pure price computation for time-windowed discounts.
//!
//! Products store `price` in minor currency units plus an optional discount
//! window (`discount_pct`, `discount_starts_at`, `discount_ends_at`). The
//! effective price is always derived here at read time; it is never persisted.
//! Resetting an expired window on the stored product is a separate step
//! (`product_service::normalize_expired_discounts`) so that reads stay free of
//! side effects.

use chrono::{DateTime, Utc};

/// Where `now` falls relative to a product's discount window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountPhase {
    /// No discount configured (zero percent or missing bounds).
    None,
    /// Window configured but not yet started.
    Upcoming,
    /// Window currently applies, bounds inclusive.
    Active,
    /// Window has passed; stored fields are due for normalization.
    Expired,
}

pub fn discount_phase(
    discount_pct: i32,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> DiscountPhase {
    if discount_pct <= 0 {
        return DiscountPhase::None;
    }
    let (Some(start), Some(end)) = (starts_at, ends_at) else {
        return DiscountPhase::None;
    };
    if now < start {
        DiscountPhase::Upcoming
    } else if now > end {
        DiscountPhase::Expired
    } else {
        DiscountPhase::Active
    }
}

/// Effective price at `now`. Deterministic and side-effect free.
///
/// Returns the base price unless the window is active; an active window of
/// `pct` percent yields `price * (100 - pct) / 100`, truncated toward zero
/// (prices are integer minor units).
pub fn final_price(
    price: i64,
    discount_pct: i32,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> i64 {
    match discount_phase(discount_pct, starts_at, ends_at, now) {
        DiscountPhase::Active => {
            let pct = i64::from(discount_pct.clamp(0, 100));
            price * (100 - pct) / 100
        }
        _ => price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn window(now: DateTime<Utc>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        (Some(now - Duration::hours(1)), Some(now + Duration::hours(1)))
    }

    #[test]
    fn no_discount_passes_price_through() {
        let now = Utc::now();
        let (start, end) = window(now);
        assert_eq!(final_price(10_000, 0, start, end, now), 10_000);
        assert_eq!(final_price(10_000, -5, start, end, now), 10_000);
        assert_eq!(final_price(10_000, 20, None, end, now), 10_000);
        assert_eq!(final_price(10_000, 20, start, None, now), 10_000);
    }

    #[test]
    fn active_window_applies_percentage() {
        let now = Utc::now();
        let (start, end) = window(now);
        assert_eq!(final_price(10_000, 20, start, end, now), 8_000);
        assert_eq!(final_price(10_000, 100, start, end, now), 0);
        // truncates toward zero on inexact division
        assert_eq!(final_price(999, 10, start, end, now), 899);
    }

    #[test]
    fn bounds_are_inclusive() {
        let start = Utc::now();
        let end = start + Duration::hours(2);
        assert_eq!(final_price(10_000, 25, Some(start), Some(end), start), 7_500);
        assert_eq!(final_price(10_000, 25, Some(start), Some(end), end), 7_500);
    }

    #[test]
    fn repeated_evaluation_is_idempotent() {
        let now = Utc::now();
        let (start, end) = window(now);
        let first = final_price(12_345, 15, start, end, now);
        for _ in 0..5 {
            assert_eq!(final_price(12_345, 15, start, end, now), first);
        }
    }

    #[test]
    fn upcoming_window_keeps_base_price() {
        let now = Utc::now();
        let start = now + Duration::hours(1);
        let end = now + Duration::hours(2);
        assert_eq!(
            discount_phase(20, Some(start), Some(end), now),
            DiscountPhase::Upcoming
        );
        assert_eq!(final_price(10_000, 20, Some(start), Some(end), now), 10_000);
    }

    #[test]
    fn expired_window_reports_expired_and_base_price() {
        let now = Utc::now();
        let start = now - Duration::hours(2);
        let end = now - Duration::seconds(1);
        assert_eq!(
            discount_phase(20, Some(start), Some(end), now),
            DiscountPhase::Expired
        );
        assert_eq!(final_price(10_000, 20, Some(start), Some(end), now), 10_000);
    }
}
