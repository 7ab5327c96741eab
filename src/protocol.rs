use serde::{Deserialize, Serialize};

/// Body of every JSON answer the intake server produces, and the only shape
/// the client decodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Literal record text appended by `/addItem`, without the newline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub written: Option<String>,
    /// Epoch milliseconds from `/getTime`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            ..Self::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn written(line: impl Into<String>) -> Self {
        Self {
            ok: true,
            written: Some(line.into()),
            ..Self::default()
        }
    }

    pub fn server_time(millis: i64) -> Self {
        Self {
            ok: true,
            server_time: Some(millis),
            ..Self::default()
        }
    }

    pub fn message(text: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: Some(text.into()),
            ..Self::default()
        }
    }
}

/// Parses a number-like query or form value. Surrounding whitespace is
/// ignored; empty input, NaN and infinities yield `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Shortest round-trip rendering: `3` rather than `3.0`, and `-0` prints as
/// `0`. Magnitudes from `1e21` up and below `1e-6` switch to exponent form
/// with an explicit sign (`1e+21`, `1.5e-7`), as existing logs do.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let exp = format!("{value:e}");
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => format!("{mantissa}e+{power}"),
            _ => exp,
        };
    }
    format!("{value}")
}
