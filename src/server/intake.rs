use serde::Deserialize;

use crate::errors::{IntakeError, IntakeResult};
use crate::protocol::parse_number;
use crate::store::LogRecord;

/// Raw `/addItem` query. Every field is optional so that missing values
/// surface as validation messages instead of extractor rejections.
#[derive(Debug, Default, Deserialize)]
pub struct AddItemParams {
    pub code: Option<String>,
    pub qtty: Option<String>,
    pub date: Option<String>,
}

/// Turns a raw request into the record to append. `now_ms` stamps requests
/// that carry no `date`.
pub fn validate(
    params: &AddItemParams,
    now_ms: i64,
    require_positive_qtty: bool,
) -> IntakeResult<LogRecord> {
    let record_code = crate::store::sanitize_code(params.code.as_deref().unwrap_or_default());
    if record_code.is_empty() {
        return Err(IntakeError::InvalidInput(
            "Missing or empty \"code\" parameter".into(),
        ));
    }

    let qtty = params
        .qtty
        .as_deref()
        .and_then(parse_number)
        .ok_or_else(|| IntakeError::InvalidInput("Missing or invalid \"qtty\" parameter".into()))?;
    if require_positive_qtty && qtty <= 0.0 {
        return Err(IntakeError::InvalidInput(
            "The \"qtty\" parameter must be greater than zero".into(),
        ));
    }

    let timestamp = match params.date.as_deref() {
        None => now_ms as f64,
        Some(raw) if raw.is_empty() => now_ms as f64,
        Some(raw) => parse_number(raw)
            .filter(|d| *d > 0.0)
            .ok_or_else(|| IntakeError::InvalidInput("Invalid \"date\" parameter".into()))?,
    };

    Ok(LogRecord {
        code: record_code,
        qtty,
        timestamp,
    })
}
