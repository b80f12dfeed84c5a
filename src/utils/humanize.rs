use chrono::{DateTime, Utc};

/// Relative description of `then` as seen from `now`, e.g. "3 hours ago".
pub fn humanize(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(then);
    let future = delta.num_seconds() < 0;
    let secs = delta.num_seconds().unsigned_abs();

    let (count, unit) = match secs {
        0..=44 => return "just now".to_string(),
        45..=89 => (1, "minute"),
        90..=2_699 => (secs.div_ceil(60).max(2), "minute"),
        2_700..=5_399 => (1, "hour"),
        5_400..=79_199 => (secs.div_ceil(3_600).max(2), "hour"),
        79_200..=129_599 => (1, "day"),
        129_600..=2_246_399 => (secs / 86_400, "day"),
        2_246_400..=3_887_999 => (1, "month"),
        3_888_000..=27_647_999 => (secs / 2_592_000, "month"),
        27_648_000..=47_303_999 => (1, "year"),
        _ => (secs / 31_536_000, "year"),
    };

    let phrase = if count == 1 {
        match unit {
            "hour" => "an hour".to_string(),
            _ => format!("a {}", unit),
        }
    } else {
        format!("{} {}s", count, unit)
    };

    if future {
        format!("in {}", phrase)
    } else {
        format!("{} ago", phrase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ago(secs: i64) -> String {
        let now = Utc::now();
        humanize(now - Duration::seconds(secs), now)
    }

    #[test]
    fn buckets() {
        assert_eq!(ago(5), "just now");
        assert_eq!(ago(60), "a minute ago");
        assert_eq!(ago(5 * 60), "5 minutes ago");
        assert_eq!(ago(60 * 60), "an hour ago");
        assert_eq!(ago(3 * 3_600), "3 hours ago");
        assert_eq!(ago(24 * 3_600), "a day ago");
        assert_eq!(ago(4 * 86_400), "4 days ago");
        assert_eq!(ago(30 * 86_400), "a month ago");
        assert_eq!(ago(90 * 86_400), "3 months ago");
        assert_eq!(ago(400 * 86_400), "a year ago");
        assert_eq!(ago(3 * 365 * 86_400), "3 years ago");
    }

    #[test]
    fn future_times() {
        assert_eq!(ago(-2 * 3_600), "in 2 hours");
    }
}
