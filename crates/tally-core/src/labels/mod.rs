//! Optional external labeling of amounts.
//!
//! A [`LabelService`] maps numeric values to roles given the document text.
//! Its answers are untrusted: keys must be finite numbers and unknown role
//! strings become [`AmountType::Unknown`]. Callers always keep the context
//! heuristic as a fallback.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::LabelError;
use crate::models::AmountType;

/// A capability that labels values found in a document.
#[async_trait]
pub trait LabelService: Send + Sync {
    /// Service name for logging.
    fn name(&self) -> &str;

    /// Label each value given the full document text.
    async fn label_values(&self, text: &str, values: &[f64]) -> Result<LabelMap, LabelError>;
}

/// Role labels keyed by exact numeric value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelMap {
    entries: Vec<(f64, AmountType)>,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a label. Non-finite values are ignored; a later label for the
    /// same value replaces the earlier one.
    pub fn insert(&mut self, value: f64, label: AmountType) {
        if !value.is_finite() {
            return;
        }
        match self.entries.iter_mut().find(|(v, _)| *v == value) {
            Some(entry) => entry.1 = label,
            None => self.entries.push((value, label)),
        }
    }

    pub fn get(&self, value: f64) -> Option<AmountType> {
        self.entries
            .iter()
            .find(|(v, _)| *v == value)
            .map(|(_, label)| *label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a map from a `{"labels": [{"value": .., "type": ..}]}` document.
    pub fn from_json(document: &Value) -> Result<Self, LabelError> {
        let labels = document
            .get("labels")
            .and_then(Value::as_array)
            .ok_or_else(|| LabelError::Malformed("missing \"labels\" array".to_string()))?;

        let mut map = LabelMap::new();
        for item in labels {
            let Some(value) = item.get("value").and_then(numeric_value) else {
                continue;
            };
            let label = item
                .get("type")
                .and_then(Value::as_str)
                .map(AmountType::from_label)
                .unwrap_or(AmountType::Unknown);
            map.insert(value, label);
        }

        Ok(map)
    }
}

impl FromIterator<(f64, AmountType)> for LabelMap {
    fn from_iter<I: IntoIterator<Item = (f64, AmountType)>>(iter: I) -> Self {
        let mut map = LabelMap::new();
        for (value, label) in iter {
            map.insert(value, label);
        }
        map
    }
}

/// Accept numbers and numeric strings, rejecting anything non-finite.
fn numeric_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Parse a free-form service answer that should contain a JSON label list.
///
/// Prose around the JSON is tolerated: the span from the first `{` to the
/// last `}` is parsed.
pub fn parse_label_response(text: &str) -> Result<LabelMap, LabelError> {
    let start = text.find('{');
    let end = text.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => return Err(LabelError::Malformed("no JSON object in response".to_string())),
    };

    let document: Value =
        serde_json::from_str(json).map_err(|e| LabelError::Malformed(e.to_string()))?;
    LabelMap::from_json(&document)
}

/// Instructions sent to a text-generating label service.
pub fn label_prompt(text: &str, values: &[f64]) -> String {
    let values = serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string());
    [
        "Label each amount found in this bill or receipt.",
        "Allowed labels: total_bill, paid, due, discount, tax, unknown.",
        "Answer with JSON only, shaped as:",
        r#"{"labels": [{"value": number, "type": "total_bill|paid|due|discount|tax|unknown"}]}"#,
        "",
        "Document text:",
        text,
        "",
        "Amounts:",
        &values,
    ]
    .join("\n")
}

/// A label service answering from a fixed map.
#[derive(Debug, Clone, Default)]
pub struct StaticLabelService {
    labels: LabelMap,
}

impl StaticLabelService {
    pub fn new(labels: LabelMap) -> Self {
        Self { labels }
    }

    /// Load labels from a JSON file shaped like a service answer.
    pub fn from_file(path: &std::path::Path) -> Result<Self, LabelError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LabelError::Unavailable(format!("{}: {}", path.display(), e)))?;
        Ok(Self::new(parse_label_response(&content)?))
    }
}

#[async_trait]
impl LabelService for StaticLabelService {
    fn name(&self) -> &str {
        "static"
    }

    async fn label_values(&self, _text: &str, values: &[f64]) -> Result<LabelMap, LabelError> {
        Ok(values
            .iter()
            .filter_map(|v| self.labels.get(*v).map(|label| (*v, label)))
            .collect())
    }
}
