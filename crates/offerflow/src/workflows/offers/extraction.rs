//! Boundary with the document-understanding collaborator.
//!
//! The extractor is an opaque producer of [`ParsedOfferRecord`]s. Its output is
//! best-effort model JSON, so every field is optional and the deserializers accept
//! blanks, bare numbers and single strings where a list was requested.
//!
//! No extractor ships with this crate. Hosts that call a model implement
//! [`OfferExtractor`] and hand uploads to
//! [`OfferLedger::ingest_document`](super::service::OfferLedger::ingest_document).
//! Saved model responses skip the document step and go through
//! [`decode_extraction_response`], which is what the command line `ingest` does.

use mime::Mime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Structured fields read from one offer letter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedOfferRecord {
    #[serde(default, deserialize_with = "loose_string")]
    pub student_name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub university: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub program: Option<String>,
    /// Expected to be Conditional, Unconditional, Reject or Waitlist but not guaranteed.
    #[serde(default, deserialize_with = "loose_string")]
    pub offer_type: Option<String>,
    #[serde(default, deserialize_with = "loose_list")]
    pub conditions: Option<Vec<String>>,
    #[serde(default, deserialize_with = "loose_string")]
    pub deposit_amount: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub deposit_deadline: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub start_term: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub offer_date: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub school_id: Option<String>,
    #[serde(default, deserialize_with = "loose_list")]
    pub next_steps: Option<Vec<String>>,
    #[serde(default, deserialize_with = "loose_string")]
    pub key_sentences: Option<String>,
}

/// Failures raised at the extraction boundary. Propagated to callers unchanged.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("offer document is empty")]
    EmptyDocument,
    #[error("unsupported document type '{0}': expected a PDF or an image")]
    UnsupportedMediaType(String),
    #[error("extraction service returned no content")]
    EmptyResponse,
    #[error("extraction service returned malformed data: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("extraction service failed: {0}")]
    Upstream(String),
}

/// Uploaded offer letter handed to the extractor.
#[derive(Debug, Clone)]
pub struct OfferDocument {
    bytes: Vec<u8>,
    mime: Mime,
}

impl OfferDocument {
    pub fn new(bytes: Vec<u8>, mime: Mime) -> Result<Self, ExtractionError> {
        if bytes.is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }

        let supported = (mime.type_() == mime::APPLICATION && mime.subtype() == mime::PDF)
            || mime.type_() == mime::IMAGE;
        if !supported {
            return Err(ExtractionError::UnsupportedMediaType(mime.to_string()));
        }

        Ok(Self { bytes, mime })
    }

    pub fn from_media_type(bytes: Vec<u8>, media_type: &str) -> Result<Self, ExtractionError> {
        let mime = media_type
            .trim()
            .parse::<Mime>()
            .map_err(|_| ExtractionError::UnsupportedMediaType(media_type.to_string()))?;
        Self::new(bytes, mime)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &Mime {
        &self.mime
    }
}

/// Document-understanding collaborator. Implementations own transport, retries and timeouts.
pub trait OfferExtractor: Send + Sync {
    fn extract(&self, document: &OfferDocument) -> Result<ParsedOfferRecord, ExtractionError>;
}

/// Decodes the raw JSON text returned by the extraction model.
pub fn decode_extraction_response(text: &str) -> Result<ParsedOfferRecord, ExtractionError> {
    let trimmed = strip_code_fence(text.trim());
    if trimmed.is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }

    Ok(serde_json::from_str(trimmed)?)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Trimmed value, or `None` when absent or blank.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}

fn scalar_text(value: Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(scalar_text))
}

fn loose_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(values)) => values.into_iter().filter_map(scalar_text).collect(),
        Some(other) => scalar_text(other).into_iter().collect(),
        None => return Ok(None),
    };
    Ok(Some(items))
}
