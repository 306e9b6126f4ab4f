//! Human-readable ages for modification times.

use std::time::{Duration, SystemTime};

/// Format a duration compactly, truncating to the largest whole unit.
pub fn format_age(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}

/// Format how long ago `time` was, relative to `now`.
///
/// Times in the future (clock skew between hosts) read as `0s ago`.
pub fn format_since(time: SystemTime, now: SystemTime) -> String {
    let elapsed = now.duration_since(time).unwrap_or(Duration::ZERO);
    format!("{} ago", format_age(elapsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::from_secs(30)), "30s");
        assert_eq!(format_age(Duration::from_secs(120)), "2m");
        assert_eq!(format_age(Duration::from_secs(7200)), "2h");
        assert_eq!(format_age(Duration::from_secs(172800)), "2d");
        assert_eq!(format_age(Duration::from_secs(3599)), "59m");
    }

    #[test]
    fn test_format_since() {
        let now = SystemTime::now();
        assert_eq!(format_since(now - Duration::from_secs(300), now), "5m ago");
        assert_eq!(format_since(now + Duration::from_secs(10), now), "0s ago");
    }
}
