/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use super::NotificationOptimizer;
use crate::common::{
    types::*,
    utils::{is_within_daily_window, minutes_since_midnight, parse_time_or_default},
};
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Delay applied outside quiet hours so related notifications arriving
/// together land in the same batch.
pub const COALESCE_DELAY_MS: i64 = 60 * 1000;

pub fn is_in_quiet_hours(quiet_hours: &QuietHours, now: DateTime<Utc>) -> bool {
    if !quiet_hours.enabled {
        return false;
    }

    let current = minutes_since_midnight(&now.with_timezone(&quiet_hours.offset()));
    let start = parse_time_or_default(&quiet_hours.start_time).minutes_since_midnight();
    let end = parse_time_or_default(&quiet_hours.end_time).minutes_since_midnight();

    is_within_daily_window(current, start, end)
}

/// When a batch created at `now` should go out.
///
/// Outside quiet hours this is `now` plus the coalescing delay. Inside, it is
/// the end of the window plus `buffer_minutes` in the user's wall clock, today
/// if that is still ahead of `now` and tomorrow otherwise.
pub fn compute_optimal_send_time(
    settings: &NotificationSettings,
    now: DateTime<Utc>,
    buffer_minutes: u32,
) -> DateTime<Utc> {
    let coalesced = now + Duration::milliseconds(COALESCE_DELAY_MS);

    if !is_in_quiet_hours(&settings.quiet_hours, now) {
        return coalesced;
    }

    let offset = settings.quiet_hours.offset();
    let end = parse_time_or_default(&settings.quiet_hours.end_time);

    let send_at = now
        .with_timezone(&offset)
        .naive_local()
        .date()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| {
            midnight.checked_add_signed(Duration::minutes(
                i64::from(end.minutes_since_midnight()) + i64::from(buffer_minutes),
            ))
        })
        .and_then(|local| offset.from_local_datetime(&local).single())
        .map(|send_at| send_at.with_timezone(&Utc));

    match send_at {
        Some(send_at) if send_at <= now => send_at
            .checked_add_signed(Duration::days(1))
            .unwrap_or(coalesced),
        Some(send_at) => send_at,
        None => coalesced,
    }
}

impl NotificationOptimizer {
    pub fn compute_optimal_send_time(&self, settings: &NotificationSettings) -> DateTime<Utc> {
        compute_optimal_send_time(settings, self.now(), self.config.quiet_hours_buffer_minutes)
    }
}
