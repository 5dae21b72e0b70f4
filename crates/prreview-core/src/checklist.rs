//! Review checklist kept as a ClickUp doc page.
//!
//! The checklist URL is the browser link of a doc page
//! (`https://app.clickup.com/{workspace}/v/dc/{doc}/{page}`). The page and its
//! sub-pages are fetched through the v3 docs API, their markdown is reduced to
//! plain text, and the result is handed to the model prompt.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{ReviewError, Result};

const CLICKUP_APP_HOST: &str = "app.clickup.com";
const DOC_MARKER: &str = "/v/dc/";
const PAGE_SEPARATOR: &str = "\n\n\n";

/// Identifies one ClickUp doc page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistLocation {
    pub workspace_id: String,
    pub doc_id: String,
    pub page_id: String,
}

impl ChecklistLocation {
    /// Parse a ClickUp doc page link.
    pub fn parse(url: &str) -> Result<Self> {
        let invalid = || ReviewError::InvalidChecklistUrl(url.to_string());

        let (_, after_host) = url.split_once(CLICKUP_APP_HOST).ok_or_else(invalid)?;
        let path = after_host
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let (workspace, doc_path) = path.split_once(DOC_MARKER).ok_or_else(invalid)?;

        let workspace_id = workspace.trim_matches('/');
        let mut ids = doc_path.trim_matches('/').split('/');
        let (doc_id, page_id) = match (ids.next(), ids.next(), ids.next()) {
            (Some(doc), Some(page), None) => (doc, page),
            _ => return Err(invalid()),
        };

        if workspace_id.is_empty()
            || workspace_id.contains('/')
            || doc_id.is_empty()
            || page_id.is_empty()
        {
            return Err(invalid());
        }

        Ok(Self {
            workspace_id: workspace_id.to_string(),
            doc_id: doc_id.to_string(),
            page_id: page_id.to_string(),
        })
    }

    /// Docs API path of this page, relative to the API root.
    pub fn api_path(&self) -> String {
        format!(
            "/api/v3/workspaces/{}/docs/{}/pages/{}",
            self.workspace_id, self.doc_id, self.page_id
        )
    }
}

/// A doc page as returned by the docs API. Only the fields we read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocPage {
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub pages: Vec<DocPage>,
}

impl DocPage {
    /// Cleaned text of this page and all sub-pages, depth first.
    pub fn flatten(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect(&self, out: &mut Vec<String>) {
        let cleaned = clean_markdown(self.content.as_deref().unwrap_or_default());
        if !cleaned.is_empty() {
            out.push(cleaned);
        }
        for page in &self.pages {
            page.collect(out);
        }
    }
}

/// Join flattened pages into the text passed to the prompt.
pub fn render_checklist(page: &DocPage) -> String {
    page.flatten().join(PAGE_SEPARATOR)
}

fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex must compile"))
}

/// Reduce ClickUp markdown to plain text, keeping table rows intact.
pub fn clean_markdown(content: &str) -> String {
    static URL: OnceLock<Regex> = OnceLock::new();
    static EMPHASIS: OnceLock<Regex> = OnceLock::new();
    static HEADING: OnceLock<Regex> = OnceLock::new();
    static BLANK_RUN: OnceLock<Regex> = OnceLock::new();
    static SPECIAL: OnceLock<Regex> = OnceLock::new();

    let text = cached(&URL, r"https?://(?:[a-zA-Z0-9$-_@.&+!*\\(),]|%[0-9a-fA-F]{2})+")
        .replace_all(content, "");

    // One alternative per marker, since the closing marker must match the opening one.
    let text = cached(&EMPHASIS, r"\*(.+?)\*|_(.+?)_|~(.+?)~|`(.+?)`").replace_all(
        &text,
        |caps: &Captures| {
            (1..=4)
                .find_map(|i| caps.get(i))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        },
    );

    let text = cached(&HEADING, r"(?m)^#+\s+(.+)$").replace_all(&text, "$1");

    let mut kept: Vec<&str> = Vec::new();
    let mut in_table = false;
    for line in text.split('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with('|') && trimmed.ends_with('|') {
            in_table = true;
            kept.push(line);
        } else if in_table && trimmed.is_empty() {
            in_table = false;
            kept.push(line);
        } else if !in_table {
            kept.push(trimmed);
        }
    }
    let text = kept.join("\n");

    let text = cached(&BLANK_RUN, r"\n{3,}").replace_all(&text, "\n\n");
    let text = cached(&SPECIAL, r"[^\w\s.,;:\-()\[\]|]").replace_all(&text, " ");

    text.split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Client for the ClickUp docs API.
pub struct ChecklistClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl ChecklistClient {
    pub fn new(http: reqwest::Client, api_url: &str, token: &str) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Fetch and clean the checklist.
    ///
    /// Request and decoding failures are logged and produce an empty
    /// checklist; the review then falls back to general guidelines.
    pub async fn fetch(&self, location: &ChecklistLocation) -> String {
        match self.fetch_page(location).await {
            Ok(page) => {
                let checklist = render_checklist(&page);
                info!(bytes = checklist.len(), "Fetched review checklist");
                checklist
            }
            Err(e) => {
                warn!(error = %e, "Could not fetch review checklist, continuing without it");
                String::new()
            }
        }
    }

    async fn fetch_page(&self, location: &ChecklistLocation) -> Result<DocPage> {
        let url = format!("{}{}", self.api_url, location.api_path());
        debug!(%url, "Requesting checklist page");

        let response = self
            .http
            .get(&url)
            .header("Authorization", &self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReviewError::Api {
                service: "ClickUp",
                status: status.as_u16(),
                body,
            });
        }

        let value: serde_json::Value = response.json().await?;
        if !value.is_object() {
            return Err(ReviewError::UnexpectedResponse(format!(
                "docs API returned a non-object body for {url}"
            )));
        }
        Ok(serde_json::from_value(value)?)
    }
}
