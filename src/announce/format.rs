//! Lap time rendering for speech and for tabular display.

/// Render a lap time for a spoken announcement: `M分S.mmm秒` when the
/// lap runs over a minute, else `S.mmm秒`.
pub fn speech_time(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor() as u64;
    let rest = seconds - minutes as f64 * 60.0;
    if minutes > 0 {
        format!("{minutes}分{rest:.3}秒")
    } else {
        format!("{rest:.3}秒")
    }
}

/// Coarser variant for standings run-downs, where millisecond precision
/// just slows the announcer down.
pub fn speech_time_coarse(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor() as u64;
    let rest = seconds - minutes as f64 * 60.0;
    if minutes > 0 {
        format!("{minutes}分{rest:.1}秒")
    } else {
        format!("{rest:.1}秒")
    }
}

/// Render a lap time as `M:SS.mmm` for tables.
pub fn clock_time(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor() as u64;
    let rest = seconds - minutes as f64 * 60.0;
    format!("{minutes}:{rest:06.3}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speech_time_under_a_minute() {
        assert_eq!(speech_time(12.5), "12.500秒");
        assert_eq!(speech_time(59.999), "59.999秒");
    }

    #[test]
    fn speech_time_over_a_minute() {
        assert_eq!(speech_time(75.2), "1分15.200秒");
        assert_eq!(speech_time(125.034), "2分5.034秒");
    }

    #[test]
    fn speech_time_exact_minute() {
        assert_eq!(speech_time(60.0), "1分0.000秒");
    }

    #[test]
    fn coarse_time_has_one_decimal() {
        assert_eq!(speech_time_coarse(11.24), "11.2秒");
        assert_eq!(speech_time_coarse(71.26), "1分11.3秒");
    }

    #[test]
    fn clock_time_pads_seconds() {
        assert_eq!(clock_time(12.5), "0:12.500");
        assert_eq!(clock_time(75.2), "1:15.200");
        assert_eq!(clock_time(9.05), "0:09.050");
    }
}
