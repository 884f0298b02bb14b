use chrono::{Local, Utc};

use crate::models::PickupWindow;

/// Current unix time shifted by the process's local UTC offset.
pub fn adjusted_now() -> i64 {
    let offset = Local::now().offset().local_minus_utc() as i64;
    Utc::now().timestamp() + offset
}

/// Parses `"start,end"`. Anything beyond the second element is ignored.
pub fn parse_pickup_time(raw: &str) -> Option<PickupWindow> {
    let mut parts = raw.split(',').map(|part| part.trim().parse::<i64>());
    let start = parts.next()?.ok()?;
    let end = parts.next()?.ok()?;
    Some(PickupWindow { start, end })
}

/// Window the courier is expected in, if it has not started yet at `now`.
pub fn courier_window_at(raw: Option<&str>, now: i64) -> Option<PickupWindow> {
    let raw = raw?;
    let window = match parse_pickup_time(raw) {
        Some(window) => window,
        None => {
            tracing::warn!(value = raw, "unparsable courier pickup time");
            return None;
        }
    };
    (window.start >= now).then_some(window)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PICKUP: &str = "2000000000,2000003600";

    #[test]
    fn window_before_start_is_returned() {
        assert_eq!(
            courier_window_at(Some(PICKUP), 1_999_999_000),
            Some(PickupWindow {
                start: 2_000_000_000,
                end: 2_000_003_600
            })
        );
    }

    #[test]
    fn window_starting_now_is_returned() {
        assert!(courier_window_at(Some(PICKUP), 2_000_000_000).is_some());
    }

    #[test]
    fn window_already_started_is_none() {
        assert_eq!(courier_window_at(Some(PICKUP), 2_000_000_001), None);
    }

    #[test]
    fn unset_or_malformed_is_none() {
        assert_eq!(courier_window_at(None, 0), None);
        assert_eq!(courier_window_at(Some("2000000000"), 0), None);
        assert_eq!(courier_window_at(Some("soon,later"), 0), None);
    }

    #[test]
    fn tolerates_whitespace() {
        assert_eq!(
            parse_pickup_time(" 10 , 20 "),
            Some(PickupWindow { start: 10, end: 20 })
        );
    }
}
