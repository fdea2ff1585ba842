//! Verification judgment and the final structured report.

use std::fmt;
use std::sync::LazyLock;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::schema::{self, FieldSchema, FieldType, ObjectSchema};

static JUDGMENT_SCHEMA: LazyLock<ObjectSchema> = LazyLock::new(|| {
    ObjectSchema::new("VerificationResult")
        .describe("Result of verification")
        .field(
            FieldSchema::required("is_complete", FieldType::Boolean)
                .describe("Whether all required data was obtained"),
        )
        .field(
            FieldSchema::required("is_valid", FieldType::Boolean)
                .describe("Whether the data is valid and useful"),
        )
        .field(
            FieldSchema::required("missing_data", FieldType::array_of(FieldType::String))
                .describe("List of missing or incomplete data points"),
        )
        .field(
            FieldSchema::required("quality_score", FieldType::Integer)
                .describe("Quality score from 0-10")
                .with_minimum(0)
                .with_maximum(10),
        )
        .field(
            FieldSchema::required("suggestions", FieldType::array_of(FieldType::String))
                .describe("Suggestions for improvement"),
        )
});

/// Overall status of a pipeline run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every step succeeded (or there were no steps).
    Success,
    /// At least one step succeeded and at least one failed.
    Partial,
    /// No step succeeded.
    Failed,
}

impl RunStatus {
    /// Derives the status from success and failure counts.
    #[must_use]
    pub const fn from_counts(successes: usize, failures: usize) -> Self {
        if failures == 0 {
            Self::Success
        } else if successes > 0 {
            Self::Partial
        } else {
            Self::Failed
        }
    }

    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quality and completeness judgment over a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationJudgment {
    /// Whether all required data was obtained.
    pub is_complete: bool,
    /// Whether the data is valid and useful.
    pub is_valid: bool,
    /// Missing or incomplete data points.
    pub missing_data: Vec<String>,
    /// Score between 0 and 10.
    pub quality_score: u8,
    /// Suggestions for improvement.
    pub suggestions: Vec<String>,
}

impl VerificationJudgment {
    /// Returns the schema requested from the model.
    #[must_use]
    pub fn schema() -> &'static ObjectSchema {
        &JUDGMENT_SCHEMA
    }

    /// Validates `value` against [`VerificationJudgment::schema`] and decodes it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaViolation`] or [`Error::Decode`] on mismatch.
    pub fn from_value(value: Value) -> Result<Self> {
        let value = schema::conform(Self::schema(), value)?;
        serde_json::from_value(value).map_err(|source| Error::Decode {
            target: "verification judgment",
            source,
        })
    }
}

/// Judgment fields reported under `metadata.verification`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSummary {
    /// Whether all required data was obtained.
    pub is_complete: bool,
    /// Whether the data is valid and useful.
    pub is_valid: bool,
    /// Missing or incomplete data points.
    pub missing_data: Vec<String>,
    /// Suggestions for improvement.
    pub suggestions: Vec<String>,
}

impl From<&VerificationJudgment> for VerificationSummary {
    fn from(judgment: &VerificationJudgment) -> Self {
        Self {
            is_complete: judgment.is_complete,
            is_valid: judgment.is_valid,
            missing_data: judgment.missing_data.clone(),
            suggestions: judgment.suggestions.clone(),
        }
    }
}

/// One failed step as listed in `metadata.errors`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepError {
    /// Step number of the failed step.
    pub step: u32,
    /// Tool the step targeted.
    pub tool: String,
    /// Final error message.
    pub error: String,
}

/// Execution statistics and verification details.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Number of executed steps.
    pub total_steps: usize,
    /// Number of successful steps.
    pub successful_steps: usize,
    /// Number of failed steps.
    pub failed_steps: usize,
    /// Quality score from the judgment.
    pub quality_score: u8,
    /// Remaining judgment fields.
    pub verification: VerificationSummary,
    /// Failed steps in plan order; absent when nothing failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<StepError>>,
}

/// Successful payloads grouped by tool name.
///
/// Tools keep the order of their first successful step and each list keeps
/// call order. Serializes as a JSON object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupedResults {
    groups: Vec<(String, Vec<Value>)>,
}

impl GroupedResults {
    /// Creates an empty grouping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `payload` to the group for `tool`, opening the group if needed.
    pub fn push(&mut self, tool: &str, payload: Value) {
        match self.groups.iter_mut().find(|(name, _)| name == tool) {
            Some((_, payloads)) => payloads.push(payload),
            None => self.groups.push((tool.to_owned(), vec![payload])),
        }
    }

    /// Payloads recorded for `tool`.
    #[must_use]
    pub fn get(&self, tool: &str) -> Option<&[Value]> {
        self.groups
            .iter()
            .find(|(name, _)| name == tool)
            .map(|(_, payloads)| payloads.as_slice())
    }

    /// Tool names in first-use order.
    pub fn tools(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(name, _)| name.as_str())
    }

    /// Number of tools with at least one payload.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` when no payload was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Serialize for GroupedResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (tool, payloads) in &self.groups {
            map.serialize_entry(tool, payloads)?;
        }
        map.end()
    }
}

struct GroupsVisitor;

impl<'de> Visitor<'de> for GroupsVisitor {
    type Value = GroupedResults;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object of payload lists keyed by tool name")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut grouped = GroupedResults::new();
        while let Some((tool, payloads)) = access.next_entry::<String, Vec<Value>>()? {
            for payload in payloads {
                grouped.push(&tool, payload);
            }
        }
        Ok(grouped)
    }
}

impl<'de> Deserialize<'de> for GroupedResults {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(GroupsVisitor)
    }
}

/// Final structured report of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinalOutput {
    /// Summary of the task taken from the plan.
    pub task_summary: String,
    /// Overall status.
    pub status: RunStatus,
    /// Successful payloads grouped by tool name.
    pub results: GroupedResults,
    /// Statistics and verification details.
    pub metadata: RunMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_follows_counts() {
        assert_eq!(RunStatus::from_counts(3, 0), RunStatus::Success);
        assert_eq!(RunStatus::from_counts(0, 0), RunStatus::Success);
        assert_eq!(RunStatus::from_counts(1, 2), RunStatus::Partial);
        assert_eq!(RunStatus::from_counts(0, 2), RunStatus::Failed);
    }

    #[test]
    fn status_serialises_lowercase() {
        assert_eq!(serde_json::to_value(RunStatus::Partial).unwrap(), json!("partial"));
        assert_eq!(RunStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn judgment_rejects_out_of_range_score() {
        let err = VerificationJudgment::from_value(json!({
            "is_complete": true,
            "is_valid": true,
            "missing_data": [],
            "quality_score": 12,
            "suggestions": []
        }))
        .unwrap_err();
        assert!(matches!(err, Error::SchemaViolation { ref path, .. } if path == "quality_score"));
    }

    #[test]
    fn grouped_results_keep_first_use_order() {
        let mut grouped = GroupedResults::new();
        grouped.push("get_weather", json!({ "city": "Paris" }));
        grouped.push("get_news", json!({ "total_results": 3 }));
        grouped.push("get_weather", json!({ "city": "Oslo" }));

        assert_eq!(grouped.tools().collect::<Vec<_>>(), vec!["get_weather", "get_news"]);
        assert_eq!(
            grouped.get("get_weather"),
            Some(&[json!({ "city": "Paris" }), json!({ "city": "Oslo" })][..])
        );
        assert_eq!(
            serde_json::to_string(&grouped).unwrap(),
            r#"{"get_weather":[{"city":"Paris"},{"city":"Oslo"}],"get_news":[{"total_results":3}]}"#
        );
    }

    #[test]
    fn grouped_results_read_back_in_document_order() {
        let grouped: GroupedResults =
            serde_json::from_str(r#"{"github_search":[1],"get_news":[2,3]}"#).unwrap();
        assert_eq!(grouped.tools().collect::<Vec<_>>(), vec!["github_search", "get_news"]);
        assert_eq!(grouped.get("get_news").map(<[Value]>::len), Some(2));
    }

    #[test]
    fn metadata_omits_errors_when_none_failed() {
        let metadata = RunMetadata {
            total_steps: 1,
            successful_steps: 1,
            failed_steps: 0,
            quality_score: 10,
            verification: VerificationSummary {
                is_complete: true,
                is_valid: true,
                missing_data: Vec::new(),
                suggestions: Vec::new(),
            },
            errors: None,
        };

        let encoded = serde_json::to_value(&metadata).unwrap();
        assert!(encoded.get("errors").is_none());
        assert_eq!(encoded["verification"]["is_complete"], true);
    }
}
