/// Format an amount with two decimals and thousands separators,
/// e.g. `-1234567.891` -> `-1,234,567.89`
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    // -0.001 rounds to 0.00; don't print a sign for it
    let negative = value < 0.0 && fixed.chars().any(|c| c != '0' && c != '.');
    format!("{}{}.{}", if negative { "-" } else { "" }, grouped, fraction)
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a date string to a more readable format
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if let Ok(d) = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        d.format("%b %d, %Y").to_string()
    } else if date.len() >= 10 && date.is_char_boundary(10) {
        date[..10].to_string()
    } else {
        date.to_string()
    }
}
