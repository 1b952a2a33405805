use std::time::Duration;

/// Current wall-clock time in epoch milliseconds
pub fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Convert a duration to whole milliseconds, rounding down
pub fn duration_to_millis(duration: Duration) -> u64 {
    duration.as_secs() * 1000 + u64::from(duration.subsec_millis())
}

/// Parse a header value to string
pub fn parse_header_to_string(value: &hyper::header::HeaderValue) -> Option<String> {
    value.to_str().ok().map(|s| s.to_string())
}

/// Parse the leading integer of a string.
///
/// Leading whitespace and a single sign are accepted, then as many ASCII
/// digits as follow; the rest of the input is ignored. `"42abc"` gives 42,
/// `"3.9"` gives 3, `"abc"` and `""` give `None`. Values past the `i64`
/// range saturate to `i64::MAX` or `i64::MIN`.
pub fn parse_leading_int(input: &str) -> Option<i64> {
    let trimmed = input.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }

    // an all-digit string only fails to parse on overflow
    Some(match rest[..digits_len].parse::<i64>() {
        Ok(magnitude) if negative => -magnitude,
        Ok(magnitude) => magnitude,
        Err(_) if negative => i64::MIN,
        Err(_) => i64::MAX,
    })
}
