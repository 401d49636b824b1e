//! Response transformer — turns the model's raw reply into the insight payload.
//!
//! Flow: strip fences / header line → parse JSON → read `Insights` →
//!       normalize entries → sort by the number embedded in each label.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::AppError;

/// Key the model is instructed to put its list under.
pub const INSIGHTS_KEY: &str = "Insights";

/// Returned with a 200 when the model found nothing to report.
pub const NO_INSIGHT_MESSAGE: &str = "There is no insight found. Please send a different text.";

/// One insight. Sizes (200 / 1500 chars) are asked of the model, never enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
}

/// An insight under its label, e.g. `"Insight 3"`.
/// Serializes as `{"Insight 3": {"summary": ..., "description": ...}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledInsight {
    pub label: String,
    pub insight: Insight,
}

impl Serialize for LabeledInsight {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.label, &self.insight)?;
        map.end()
    }
}

impl LabeledInsight {
    /// First run of ASCII digits in the label.
    pub fn embedded_index(&self) -> Option<u64> {
        embedded_index(&self.label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsightOutcome {
    /// Non-empty list, ascending by embedded index.
    Found(Vec<LabeledInsight>),
    /// Valid JSON, but `Insights` was absent or empty (`null`, `""`, `false`,
    /// `0`, `[]`, `{}`).
    Empty,
    /// `Insights` holds a value that is not label → insight shaped. Returned
    /// to the caller as the model produced it.
    Unstructured(Value),
}

/// Parses a model reply produced by the insights template.
///
/// Only a reply that is not JSON at all is a `ResponseParseFailure`.
pub fn transform_insights(raw: &str) -> Result<InsightOutcome, AppError> {
    let parsed: Value = serde_json::from_str(strip_wrapping(raw))
        .map_err(|e| AppError::ResponseParseFailure(e.to_string()))?;

    let Some(insights) = parsed.get(INSIGHTS_KEY) else {
        return Ok(InsightOutcome::Empty);
    };

    if is_empty_value(insights) {
        return Ok(InsightOutcome::Empty);
    }

    let normalized = match insights {
        Value::Array(items) => collect_from_array(items),
        Value::Object(map) if is_flat_insight(map) => flat_entry(0, insights).map(|e| vec![e]),
        Value::Object(map) => collect_from_map(map),
        _ => None,
    };

    match normalized {
        Some(mut entries) => {
            sort_by_embedded_index(&mut entries);
            Ok(InsightOutcome::Found(entries))
        }
        None => {
            warn!("'{INSIGHTS_KEY}' is not label/insight shaped; returning it unchanged");
            Ok(InsightOutcome::Unstructured(insights.clone()))
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Stable ascending sort on the embedded index; unnumbered labels go last,
/// in the order the model wrote them.
pub fn sort_by_embedded_index(entries: &mut [LabeledInsight]) {
    entries.sort_by_key(|e| match e.embedded_index() {
        Some(n) => (false, n),
        None => (true, 0),
    });
}

/// `None` as soon as one entry does not fit.
fn collect_from_array(items: &[Value]) -> Option<Vec<LabeledInsight>> {
    let mut entries = Vec::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        match item {
            Value::Object(map) if is_flat_insight(map) => entries.push(flat_entry(position, item)?),
            Value::Object(map) if !map.is_empty() => entries.extend(collect_from_map(map)?),
            _ => return None,
        }
    }
    Some(entries)
}

fn collect_from_map(map: &Map<String, Value>) -> Option<Vec<LabeledInsight>> {
    map.iter()
        .map(|(label, value)| {
            Some(LabeledInsight {
                label: label.clone(),
                insight: as_insight(value)?,
            })
        })
        .collect()
}

/// An object whose `summary`/`description` are strings (or missing).
fn as_insight(value: &Value) -> Option<Insight> {
    match value {
        Value::Object(_) => Insight::deserialize(value).ok(),
        _ => None,
    }
}

/// `{"summary": ..., "description": ...}` with no label around it.
fn is_flat_insight(map: &Map<String, Value>) -> bool {
    map.contains_key("summary") || map.contains_key("description")
}

fn flat_entry(position: usize, value: &Value) -> Option<LabeledInsight> {
    let insight = as_insight(value)?;
    warn!("Model returned an unlabeled insight at position {position}");
    Some(LabeledInsight {
        label: format!("Insight {}", position + 1),
        insight,
    })
}

fn embedded_index(label: &str) -> Option<u64> {
    let start = label.find(|c: char| c.is_ascii_digit())?;
    let digits: String = label[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Removes what models tend to wrap around a JSON reply despite the prompt:
/// a markdown fence (with or without a language tag) and a bare `json`
/// header line.
pub fn strip_wrapping(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(inner) = body.strip_prefix("```") {
        body = inner.strip_suffix("```").unwrap_or(inner).trim();
    }

    // Fence tag (```json) or header line (json\n{...}) leave the same prefix.
    match body.strip_prefix("json") {
        Some(rest) if rest.starts_with(|c: char| c.is_whitespace() || c == '{' || c == '[') => {
            rest.trim_start()
        }
        _ => body,
    }
}
