//! Reward entitlement.
//!
//! ```text
//! reward = floor( amount_part + time_part )
//!   amount_part = total / 100 * 2              when total > 0
//!   time_part   = time_spent * 0.5             when total > 250 and time_spent > 0
//! ```
//!
//! The sum is floored once, at the end.

/// Orders above this total earn the dwell-time component.
pub const TIME_BONUS_THRESHOLD: f64 = 250.0;

/// Loyalty tokens earned by an order. `time_spent` is in minutes.
///
/// Non-finite or negative inputs contribute nothing.
pub fn compute_reward(total: f64, time_spent: f64) -> u64 {
    let total = sanitize(total);
    let time_spent = sanitize(time_spent);

    let amount_part = if total > 0.0 { total / 100.0 * 2.0 } else { 0.0 };
    let time_part = if total > TIME_BONUS_THRESHOLD && time_spent > 0.0 {
        time_spent * 0.5
    } else {
        0.0
    };

    // Float-to-int casts saturate.
    (amount_part + time_part).floor() as u64
}

fn sanitize(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}
