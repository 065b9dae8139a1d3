/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use crate::common::types::{NotificationType, TimeOfDay, UserId};
use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};

const CONTENT_HASH_LENGTH: usize = 16;

fn parse_leading_number(value: &str) -> Option<u32> {
    let digits: String = value
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u32>().ok()
}

/// Parses `"HH:MM"`. A missing or unparsable half is read as `0`, so garbage
/// degrades to midnight.
pub fn parse_time_or_default(value: &str) -> TimeOfDay {
    let mut parts = value.split(':');
    let hours = parts.next().and_then(parse_leading_number).unwrap_or(0);
    let minutes = parts.next().and_then(parse_leading_number).unwrap_or(0);
    TimeOfDay { hours, minutes }
}

pub fn minutes_since_midnight<Tz: TimeZone>(time: &DateTime<Tz>) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Both bounds are inclusive. `start > end` means the window wraps past midnight.
pub fn is_within_daily_window(current: u32, start: u32, end: u32) -> bool {
    if start <= end {
        start <= current && current <= end
    } else {
        current >= start || current <= end
    }
}

pub fn content_hash(notification_type: &NotificationType, title: &str, message: &str) -> String {
    let fingerprint = format!("{}:{}:{}", notification_type, title, message);
    let mut digest = sha256::digest(fingerprint.as_bytes());
    digest.truncate(CONTENT_HASH_LENGTH);
    digest
}

pub fn duplicate_key(
    UserId(user_id): &UserId,
    notification_type: &NotificationType,
    content_hash: &str,
) -> String {
    format!("{user_id}:{notification_type}:{content_hash}")
}

pub fn duration_from_millis(millis: u64) -> Duration {
    Duration::milliseconds(i64::try_from(millis).unwrap_or(i64::MAX))
}

/// `time + millis`, pinned to the latest representable instant instead of overflowing.
pub fn saturating_add_millis(time: DateTime<Utc>, millis: u64) -> DateTime<Utc> {
    time.checked_add_signed(duration_from_millis(millis))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
