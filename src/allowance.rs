//! Daily allowance calculator.
//!
//! Derives a suggested safe spend per day from a sheet's period and
//! remaining amount. The figure shown for a calendar day is frozen in the
//! sheet's [`AllowanceSnapshot`] the first time a non-zero value is
//! computed that day, so it does not jitter while the user keeps entering
//! the day's expenses. The next-day preview is never frozen.
//!
//! The day count spans the whole period (`end - start + 1`), not the days
//! left from today: the allowance only shrinks as the month progresses if
//! the period start is advanced.

use chrono::NaiveDate;

use crate::models::{AllowanceSnapshot, PeriodSettings, Sheet, day_key};
use crate::totals;

/// Signed number of days from `start` to `end`.
#[inline]
#[must_use]
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    end.signed_duration_since(start).num_days()
}

/// Inclusive length of a period in days; zero if either bound is not a
/// valid date or the end precedes the start.
#[must_use]
pub fn period_days(period: &PeriodSettings) -> i64 {
    match (period.start(), period.end()) {
        (Some(start), Some(end)) => days_between(start, end).saturating_add(1).max(0),
        _ => 0,
    }
}

/// Replaces `NaN` and infinities with zero.
#[inline]
#[must_use]
pub const fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Rounds to the nearest whole currency unit, halves toward positive
/// infinity. Non-finite input yields zero.
#[inline]
#[must_use]
pub fn round_currency(value: f64) -> f64 {
    finite_or_zero((finite_or_zero(value) + 0.5).floor())
}

/// Divides `amount` over `days`, rounded; zero for an empty period.
#[allow(
    clippy::cast_precision_loss,
    reason = "day counts are far below 2^52"
)]
fn per_day(amount: f64, days: i64) -> f64 {
    if days > 0 {
        round_currency(amount / days as f64)
    } else {
        0.0
    }
}

/// Allowance figures for one sheet on one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAllowance {
    /// Inclusive length of the sheet's period.
    pub days_remaining: i64,
    /// Remaining amount the allowance was derived from.
    pub remaining_amount: f64,
    /// Freshly computed allowance for today, rounded.
    pub computed: f64,
    /// Allowance to display: the frozen snapshot value if today already
    /// has a non-zero one, otherwise [`Self::computed`].
    pub daily: f64,
    /// Whether [`Self::daily`] comes from today's frozen snapshot.
    pub frozen: bool,
    /// Live preview of tomorrow's rate, never frozen.
    pub next_day: f64,
    /// Snapshot the sheet should now hold, if it differs from the stored
    /// one.
    pub snapshot_update: Option<AllowanceSnapshot>,
}

impl DailyAllowance {
    /// Computes the allowance of `sheet` as seen on `today`.
    #[must_use]
    pub fn compute(sheet: &Sheet, today: NaiveDate) -> Self {
        let days = period_days(&sheet.period_settings);
        let remaining = finite_or_zero(totals::remaining_amount(sheet));
        let computed = per_day(remaining, days);
        let next_day = per_day(remaining, days.saturating_sub(1));

        let key = day_key(today);
        let frozen_amount = sheet
            .allowance_snapshot
            .as_ref()
            .filter(|snapshot| snapshot.date == key)
            .map(|snapshot| round_currency(snapshot.amount))
            .filter(|amount| *amount != 0.0);

        match frozen_amount {
            Some(amount) => Self {
                days_remaining: days,
                remaining_amount: remaining,
                computed,
                daily: amount,
                frozen: true,
                next_day,
                snapshot_update: None,
            },
            None => {
                let fresh = AllowanceSnapshot::new(today, computed);
                let snapshot_update = (totals::has_meaningful_data(sheet)
                    && sheet.allowance_snapshot.as_ref() != Some(&fresh))
                .then_some(fresh);
                Self {
                    days_remaining: days,
                    remaining_amount: remaining,
                    computed,
                    daily: computed,
                    frozen: false,
                    next_day,
                    snapshot_update,
                }
            }
        }
    }
}

/// Returns `sheet` with its allowance snapshot brought up to date for
/// `today`.
///
/// Intended to run once per day boundary per sheet (and again after edits
/// on a day whose snapshot is still zero). The input is returned unchanged
/// when today's value is already frozen or the sheet has no data yet.
#[must_use]
pub fn refresh_allowance_snapshot(sheet: &Sheet, today: NaiveDate) -> Sheet {
    let mut refreshed = sheet.clone();
    if let Some(snapshot) = DailyAllowance::compute(sheet, today).snapshot_update {
        refreshed.allowance_snapshot = Some(snapshot);
    }
    refreshed
}
