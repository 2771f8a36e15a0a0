//! Bill field extraction from vision model output.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Extraction errors.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("API request failed: {0}")]
    Network(String),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("Failed to parse AI response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ExtractionError {
    /// True when the endpoint could not be reached or refused the request.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Status { .. })
    }
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// Fields read off a bill photo. Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedBillFields {
    pub vendor_name: Option<String>,
    /// Accepts a JSON number or a numeric string such as `"$1,204.50"`.
    #[serde(default, deserialize_with = "lenient_amount")]
    pub bill_amount: Option<f64>,
    /// Expected as `YYYY-MM-DD`; validated by the caller. Non-string values
    /// are kept as their JSON text so the caller sees them as unparseable.
    #[serde(default, deserialize_with = "lenient_date")]
    pub bill_date: Option<String>,
}

impl ExtractedBillFields {
    /// Amount as a non-negative decimal, `0.0` when missing or invalid.
    pub fn amount_or_zero(&self) -> f64 {
        match self.bill_amount {
            Some(amount) if amount.is_finite() && amount >= 0.0 => amount,
            _ => 0.0,
        }
    }
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_start_matches('$')
            .replace(',', "")
            .trim()
            .parse::<f64>()
            .ok(),
        _ => None,
    }))
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }))
}

/// Remove surrounding whitespace and literal ```` ```json ```` / ```` ``` ```` fence markers.
///
/// Models frequently wrap JSON in a markdown code block even when told not to.
pub fn strip_code_fences(text: &str) -> String {
    text.trim()
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Parse model output into bill fields.
///
/// The fence-stripped text must be a single JSON object. If it is not, the
/// outermost `{...}` slice is tried once before giving up.
pub fn parse_extraction(text: &str) -> ExtractionResult<ExtractedBillFields> {
    let cleaned = strip_code_fences(text);

    match parse_object(&cleaned) {
        Ok(fields) => Ok(fields),
        Err(strict_err) => {
            let start = cleaned.find('{');
            let end = cleaned.rfind('}');
            match (start, end) {
                (Some(start), Some(end)) if start < end => {
                    parse_object(&cleaned[start..=end]).map_err(|_| strict_err)
                }
                _ => Err(strict_err),
            }
        }
    }
}

fn parse_object(json: &str) -> ExtractionResult<ExtractedBillFields> {
    let value: Value = serde_json::from_str(json)?;
    if !value.is_object() {
        return Err(ExtractionError::InvalidFormat(
            "Expected a JSON object".into(),
        ));
    }
    Ok(serde_json::from_value(value)?)
}
