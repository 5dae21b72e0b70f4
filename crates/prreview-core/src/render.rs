//! Markdown rendering of a [`ReviewSet`] into a GitHub review payload.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::review::{FileOutcome, FileReview, ReviewSet};

const SUMMARY_HEADING: &str = "## 🤖 AI-Powered Code Review Summary";
const SUMMARY_FOOTER: &str = "> Please review the individual file comments for detailed feedback.";

/// Review verdict sent to GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewEvent {
    Approve,
    RequestChanges,
    Comment,
}

/// One inline comment of a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewComment {
    pub path: String,
    pub body: String,
    /// Line offset inside the file's diff hunk.
    pub position: u32,
}

/// Body of `POST /repos/{repo}/pulls/{number}/reviews`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewPayload {
    pub body: String,
    pub event: ReviewEvent,
    pub comments: Vec<ReviewComment>,
}

impl ReviewPayload {
    /// One comment per file at position 1, plus the summary body.
    pub fn from_reviews(reviews: &ReviewSet) -> Self {
        let comments = reviews
            .iter()
            .map(|(path, outcome)| ReviewComment {
                path: path.to_string(),
                body: render_file_comment(path, outcome),
                position: 1,
            })
            .collect();

        Self {
            body: render_summary(reviews),
            event: ReviewEvent::RequestChanges,
            comments,
        }
    }
}

/// Comment body for one file.
pub fn render_file_comment(path: &str, outcome: &FileOutcome) -> String {
    let mut out = format!("### 📄 {path} - AI Analysis\n\n");
    match outcome {
        FileOutcome::Failed { error } => {
            let _ = write!(out, "❌ **Error reviewing {path}:** {error}\n\n");
        }
        FileOutcome::Reviewed(review) => render_review(&mut out, review),
    }
    out.trim().to_string()
}

fn render_review(out: &mut String, review: &FileReview) {
    let _ = write!(
        out,
        "**🔍 Overall Assessment:** {}\n\n",
        review.general_assessment
    );

    out.push_str("**👍 Positive Aspects:**\n");
    for aspect in &review.positive_aspects {
        let _ = writeln!(out, "- {aspect}");
    }
    out.push('\n');

    out.push_str("**⚠️ Issues:**\n");
    for issue in &review.issues {
        let _ = writeln!(
            out,
            "- **Severity:** {} (Line {}): {}",
            issue.severity, issue.line, issue.description
        );
        let _ = write!(out, "  **Suggestion:** {}\n\n", issue.suggestion);
    }

    out.push_str("**📋 Checklist Violations:**\n");
    for violation in &review.checklist_violations {
        let _ = writeln!(out, "- **Item:** {}", violation.item);
        let _ = writeln!(out, "  **Explanation:** {}", violation.explanation);
        let _ = write!(
            out,
            "  **Recommendation:** {}\n\n",
            violation.recommendation
        );
    }
}

/// Top-level review body listing every file's assessment.
pub fn render_summary(reviews: &ReviewSet) -> String {
    let mut out = format!("{SUMMARY_HEADING}\n\n");
    for (path, outcome) in reviews.iter() {
        let _ = writeln!(out, "- **{path}**: {}", outcome.assessment());
    }
    out.push('\n');
    out.push_str(SUMMARY_FOOTER);
    out.trim().to_string()
}
