//! Structured review of one file, as produced by the model.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ReviewError, Result};

/// The model's review of a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    pub general_assessment: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub positive_aspects: Vec<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub issues: Vec<Issue>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub checklist_violations: Vec<ChecklistViolation>,
}

/// Models sometimes send `null` for an empty list.
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A problem found in the diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Critical, Major or Minor. Kept verbatim.
    pub severity: String,

    #[serde(default)]
    pub line: LineRef,

    pub description: String,

    pub suggestion: String,
}

/// Where an issue sits. Models emit numbers, ranges as text, or nothing.
///
/// Only displayed, so any other JSON value is kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LineRef {
    Number(u64),
    Text(String),
    #[default]
    Unknown,
    Other(serde_json::Value),
}

impl fmt::Display for LineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineRef::Number(n) => write!(f, "{n}"),
            LineRef::Text(s) => write!(f, "{s}"),
            LineRef::Unknown => write!(f, "?"),
            LineRef::Other(value) => write!(f, "{value}"),
        }
    }
}

/// A checklist rule the change does not follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistViolation {
    pub item: String,
    pub explanation: String,
    pub recommendation: String,
}

/// Result of reviewing one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileOutcome {
    Reviewed(FileReview),
    Failed { error: String },
}

impl FileOutcome {
    /// Summary line shown in the review body.
    pub fn assessment(&self) -> &str {
        match self {
            FileOutcome::Reviewed(review) => &review.general_assessment,
            FileOutcome::Failed { .. } => "Review failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FileOutcome::Failed { .. })
    }
}

/// Outcomes for every file of a diff, in diff order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewSet {
    entries: Vec<(String, FileOutcome)>,
}

impl ReviewSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome for `path`, replacing an earlier one in place.
    pub fn insert(&mut self, path: impl Into<String>, outcome: FileOutcome) {
        let path = path.into();
        match self.entries.iter_mut().find(|(p, _)| *p == path) {
            Some((_, existing)) => *existing = outcome,
            None => self.entries.push((path, outcome)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileOutcome)> {
        self.entries.iter().map(|(p, o)| (p.as_str(), o))
    }

    pub fn get(&self, path: &str) -> Option<&FileOutcome> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, o)| o)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|(_, o)| o.is_failed()).count()
    }
}

// Serialized as a path -> outcome object, preserving diff order.
impl Serialize for ReviewSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Decode the model's text into a [`FileReview`].
///
/// The reply should be a bare JSON object. Replies wrapped in a markdown
/// fence or surrounded by prose are accepted as long as they contain a
/// single top-level object.
pub fn parse_review(output: &str) -> Result<FileReview> {
    let trimmed = output.trim();
    if let Ok(review) = serde_json::from_str::<FileReview>(trimmed) {
        return Ok(review);
    }

    let (start, end) = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            return Err(ReviewError::InvalidModelOutput(
                "no JSON object in model output".to_string(),
            ))
        }
    };

    serde_json::from_str::<FileReview>(&trimmed[start..=end])
        .map_err(|e| ReviewError::InvalidModelOutput(e.to_string()))
}
