//! Partial date edits: merge independently edited day, month and year into
//! a new local capture time.

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use super::action::{Action, IntField};
use crate::db::UNKNOWN;
use crate::error::{Error, Result};

/// New local timestamp plus the year/month/day columns to store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateChange {
    pub local: NaiveDateTime,
    pub year: i32,
    pub month: i32,
    pub day: i32,
}

/// Number of days in `month` of `year`.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(next.signed_duration_since(first).num_days() as u32)
}

/// Apply day/month/year edits to `base`, the photo's current local time.
///
/// Components without an `Update` action keep the value from `base`. The day
/// is clamped to the length of the resulting month, which depends on the
/// photo, so the same edit can land on different days for different photos.
/// A requested day of [`UNKNOWN`] builds the timestamp on day 1 but reports
/// the day as unknown. Reported year and month are the requested values
/// verbatim; without an edit they are the photo's current `cur_*` columns.
#[allow(clippy::too_many_arguments)]
pub fn compute_date_change(
    base: NaiveDateTime,
    cur_year: i32,
    cur_month: i32,
    cur_day: i32,
    day: &IntField,
    month: &IntField,
    year: &IntField,
) -> Result<DateChange> {
    let year_edit = (year.action == Action::Update).then_some(year.value);
    let month_edit = (month.action == Action::Update).then_some(month.value);
    let day_edit = (day.action == Action::Update).then_some(day.value);

    let cal_year = match year_edit {
        Some(y) if y > 0 => y,
        _ => base.year(),
    };
    let cal_month = match month_edit {
        Some(m) if (1..=12).contains(&m) => m as u32,
        _ => base.month(),
    };
    let cal_day = match day_edit {
        Some(UNKNOWN) => 1,
        Some(d) if d > 0 => d as u32,
        _ => base.day(),
    };

    let last_day = days_in_month(cal_year, cal_month)
        .ok_or_else(|| Error::InvalidDate(format!("{}-{:02}", cal_year, cal_month)))?;
    let clamped = cal_day.min(last_day);

    let date = NaiveDate::from_ymd_opt(cal_year, cal_month, clamped)
        .ok_or_else(|| Error::InvalidDate(format!("{}-{:02}-{:02}", cal_year, cal_month, clamped)))?;

    let out_day = match day_edit {
        Some(UNKNOWN) => UNKNOWN,
        Some(_) => clamped as i32,
        None if cur_day == UNKNOWN => UNKNOWN,
        None => clamped as i32,
    };

    Ok(DateChange {
        local: date.and_time(base.time()),
        year: year_edit.unwrap_or(cur_year),
        month: month_edit.unwrap_or(cur_month),
        day: out_day,
    })
}

/// Offset of `zone` from UTC at the local time `local`.
///
/// Accepts `UTC`, `Z`, fixed offsets such as `+02:00` and IANA names such
/// as `Europe/Berlin`. For IANA zones the offset depends on `local`, so
/// moving a photo across a daylight saving change shifts it. Ambiguous
/// local times take the earlier instant. Unknown zones and local times
/// that fall into a gap yield `None`.
pub fn zone_offset(zone: &str, local: NaiveDateTime) -> Option<Duration> {
    let zone = zone.trim();
    if zone.is_empty() {
        return None;
    }
    if zone.eq_ignore_ascii_case("utc") || zone == "Z" {
        return Some(Duration::zero());
    }
    let utc = if let Ok(offset) = zone.parse::<FixedOffset>() {
        offset.from_local_datetime(&local).earliest()?.naive_utc()
    } else {
        let tz: Tz = zone.parse().ok()?;
        tz.from_local_datetime(&local).earliest()?.naive_utc()
    };
    Some(local - utc)
}

/// UTC time for `local` in `zone`. Zones that cannot be resolved keep
/// `fallback`, the offset the photo had before the edit.
pub fn utc_from_local(local: NaiveDateTime, zone: &str, fallback: Duration) -> NaiveDateTime {
    local - zone_offset(zone, local).unwrap_or(fallback)
}
