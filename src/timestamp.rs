use chrono::{Local, TimeZone};

use crate::error::{AppError, Result};

/// Render a Slack `ts` token (e.g. "1462574433.000021", seconds since the
/// epoch with optional fractional precision) as a local date-time string with
/// second precision. The fractional part is not preserved in the rendering.
pub fn format_ts(ts: &str) -> Result<String> {
    let seconds = parse_ts_seconds(ts)?;
    let rendered = Local
        .timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| AppError::InvalidTimestamp(ts.to_string()))?
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();
    Ok(rendered)
}

/// Whole seconds of a `ts` token, fractional part discarded.
fn parse_ts_seconds(ts: &str) -> Result<i64> {
    let value: f64 = ts
        .parse()
        .map_err(|_| AppError::InvalidTimestamp(ts.to_string()))?;
    if !value.is_finite() {
        return Err(AppError::InvalidTimestamp(ts.to_string()));
    }
    Ok(value.trunc() as i64)
}
