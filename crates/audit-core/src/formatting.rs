use chrono::NaiveDate;

/// Unit labels used by [`format_byte_size`], smallest first.
const BYTE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Format a byte count using binary (1024) steps up to terabytes.
///
/// Values that are not finite or are negative yield `"N/A"`; zero yields
/// `"0 Bytes"`. Anything past 1024 TB stays in TB.
///
/// # Examples
///
/// ```
/// use audit_core::formatting::format_byte_size;
///
/// assert_eq!(format_byte_size(0.0), "0 Bytes");
/// assert_eq!(format_byte_size(512.0), "512.00 Bytes");
/// assert_eq!(format_byte_size(1536.0), "1.50 KB");
/// assert_eq!(format_byte_size(-1.0), "N/A");
/// ```
pub fn format_byte_size(value: f64) -> String {
    if !value.is_finite() || value < 0.0 {
        return "N/A".to_string();
    }
    if value == 0.0 {
        return "0 Bytes".to_string();
    }

    let mut size = value;
    let mut unit = 0;
    while size >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, BYTE_UNITS[unit])
}

/// [`format_byte_size`] for loosely typed input such as raw JSON values.
///
/// Anything that is not a JSON number yields `"N/A"`.
///
/// # Examples
///
/// ```
/// use audit_core::formatting::format_byte_size_json;
/// use serde_json::json;
///
/// assert_eq!(format_byte_size_json(&json!(2048)), "2.00 KB");
/// assert_eq!(format_byte_size_json(&json!("2048")), "N/A");
/// ```
pub fn format_byte_size_json(value: &serde_json::Value) -> String {
    match value.as_f64() {
        Some(n) => format_byte_size(n),
        None => "N/A".to_string(),
    }
}

/// Render a report date as `DD-MM-YYYY`.
///
/// ```
/// use audit_core::formatting::format_report_date;
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
/// assert_eq!(format_report_date(date), "03-01-2024");
/// ```
pub fn format_report_date(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
