//! Splitting a unified pull-request diff into per-file chunks.

use serde::{Deserialize, Serialize};

const FILE_HEADER: &str = "diff --git";

/// The part of a diff that belongs to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    /// Path on the post-change side (`b/` prefix removed).
    pub path: String,

    /// Lines after the `diff --git` header, joined with `\n`.
    pub body: String,
}

/// Split `diff_text` at every `diff --git` header.
///
/// Text before the first header is dropped. A path seen twice keeps its
/// first position and takes the later body.
pub fn split_diff(diff_text: &str) -> Vec<FileDiff> {
    let mut files: Vec<FileDiff> = Vec::new();
    let mut current: Option<String> = None;
    let mut lines: Vec<&str> = Vec::new();

    for line in diff_text.split('\n') {
        if line.starts_with(FILE_HEADER) {
            if let Some(path) = current.take() {
                push_file(&mut files, path, lines.join("\n"));
            }
            current = Some(header_path(line));
            lines.clear();
        } else {
            lines.push(line);
        }
    }

    if let Some(path) = current {
        push_file(&mut files, path, lines.join("\n"));
    }

    files
}

fn header_path(header: &str) -> String {
    let last = header.split_whitespace().last().unwrap_or_default();
    last.strip_prefix("b/").unwrap_or(last).to_string()
}

fn push_file(files: &mut Vec<FileDiff>, path: String, body: String) {
    match files.iter_mut().find(|f| f.path == path) {
        Some(existing) => existing.body = body,
        None => files.push(FileDiff { path, body }),
    }
}
