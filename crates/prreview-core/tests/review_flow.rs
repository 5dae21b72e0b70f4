//! End-to-end review runs against mocked GitHub, ClickUp and Ollama APIs.

use std::collections::HashMap;

use mockito::{Matcher, Server, ServerGuard};
use prreview_core::{run_review, ReviewEnv, ReviewError, ReviewSettings};
use serde_json::json;

const DIFF: &str = "\
diff --git a/src/app.rs b/src/app.rs
index 1..2 100644
--- a/src/app.rs
+++ b/src/app.rs
@@ -1 +1,2 @@
+let user = find_user(id).unwrap();
diff --git a/docs/guide.md b/docs/guide.md
index 3..4 100644
--- a/docs/guide.md
+++ b/docs/guide.md
@@ -1 +1 @@
-Old
+New
";

fn env_for(server: &ServerGuard, checklist_url: &str) -> ReviewEnv {
    let vars: HashMap<&str, String> = HashMap::from([
        ("GITHUB_TOKEN", "ghp_test".to_string()),
        ("CLICKUP_TOKEN", "pk_test".to_string()),
        ("OLLAMA_API_URL", server.url()),
        ("CHECKLIST_API_URL", checklist_url.to_string()),
        ("PR_NUMBER", "42".to_string()),
        ("GITHUB_REPOSITORY", "org/repo".to_string()),
    ]);
    ReviewEnv::from_lookup(|k| vars.get(k).cloned()).expect("valid env")
}

fn settings_for(server: &ServerGuard) -> ReviewSettings {
    ReviewSettings {
        github_api_url: server.url(),
        clickup_api_url: server.url(),
        retries: 2,
        ..ReviewSettings::default()
    }
}

const CHECKLIST_URL: &str = "https://app.clickup.com/9012/v/dc/doc-1/page-1";

fn ollama_reply(review: serde_json::Value) -> String {
    json!({ "model": "llama3.1", "response": review.to_string(), "done": true }).to_string()
}

#[tokio::test]
async fn test_full_review_is_posted() {
    let mut server = Server::new_async().await;

    let diff_mock = server
        .mock("GET", "/repos/org/repo/pulls/42")
        .match_header("accept", "application/vnd.github.v3.diff")
        .with_status(200)
        .with_body(DIFF)
        .create_async()
        .await;

    let checklist_mock = server
        .mock("GET", "/api/v3/workspaces/9012/docs/doc-1/pages/page-1")
        .match_header("authorization", "pk_test")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "content": "# Rules\n**No unwrap** in request handlers",
                "pages": [{ "content": "Document public functions" }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let app_review = server
        .mock("POST", "/api/generate")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("Review the following file: src/app.rs".to_string()),
            Matcher::Regex("No unwrap in request handlers".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ollama_reply(json!({
            "file_name": "src/app.rs",
            "general_assessment": "Unwrap on a lookup result.",
            "positive_aspects": [],
            "issues": [{
                "severity": "Critical",
                "line": 1,
                "description": "Panics when the user is missing",
                "suggestion": "Handle the None case"
            }],
            "checklist_violations": []
        })))
        .expect(1)
        .create_async()
        .await;

    let guide_review = server
        .mock("POST", "/api/generate")
        .match_body(Matcher::Regex(
            "Review the following file: docs/guide.md".to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ollama_reply(json!("not a review")))
        .expect(2)
        .create_async()
        .await;

    let post_mock = server
        .mock("POST", "/repos/org/repo/pulls/42/reviews")
        .match_header("authorization", "token ghp_test")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({
                "event": "REQUEST_CHANGES",
                "comments": [
                    { "path": "src/app.rs", "position": 1 },
                    { "path": "docs/guide.md", "position": 1 }
                ]
            })),
            Matcher::Regex("Failed to get a valid response after 2 attempts".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": 1001}"#)
        .create_async()
        .await;

    let env = env_for(&server, CHECKLIST_URL);
    let report = run_review(&env, &settings_for(&server)).await.expect("review run");

    assert_eq!(report.files_reviewed, 2);
    assert_eq!(report.files_failed, 1);
    assert_eq!(report.github_response.unwrap()["id"], 1001);

    let summary = &report.payload.as_ref().unwrap().body;
    assert!(summary.contains("- **src/app.rs**: Unwrap on a lookup result."));
    assert!(summary.contains("- **docs/guide.md**: Review failed"));

    diff_mock.assert_async().await;
    checklist_mock.assert_async().await;
    app_review.assert_async().await;
    guide_review.assert_async().await;
    post_mock.assert_async().await;
}

#[tokio::test]
async fn test_checklist_outage_does_not_block_review() {
    let mut server = Server::new_async().await;

    let _diff = server
        .mock("GET", "/repos/org/repo/pulls/42")
        .with_status(200)
        .with_body("diff --git a/a.rs b/a.rs\n+fn a() {}\n")
        .create_async()
        .await;
    let _checklist = server
        .mock("GET", "/api/v3/workspaces/9012/docs/doc-1/pages/page-1")
        .with_status(503)
        .create_async()
        .await;
    let _generate = server
        .mock("POST", "/api/generate")
        // The prompt travels JSON-encoded, so newlines appear as `\n`.
        .match_body(Matcher::Regex(r"Checklist:\\n\\n\\nDiff:".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ollama_reply(json!({ "general_assessment": "Trivial." })))
        .create_async()
        .await;
    let post_mock = server
        .mock("POST", "/repos/org/repo/pulls/42/reviews")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": 5}"#)
        .create_async()
        .await;

    let env = env_for(&server, CHECKLIST_URL);
    let report = run_review(&env, &settings_for(&server)).await.expect("review run");

    assert_eq!(report.files_failed, 0);
    post_mock.assert_async().await;
}

#[tokio::test]
async fn test_malformed_checklist_body_is_treated_as_empty() {
    for body in [r#"["not", "an", "object"]"#, "<html>maintenance</html>"] {
        let mut server = Server::new_async().await;

        let _diff = server
            .mock("GET", "/repos/org/repo/pulls/42")
            .with_status(200)
            .with_body("diff --git a/a.rs b/a.rs\n+fn a() {}\n")
            .create_async()
            .await;
        let checklist_mock = server
            .mock("GET", "/api/v3/workspaces/9012/docs/doc-1/pages/page-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;
        let generate_mock = server
            .mock("POST", "/api/generate")
            .match_body(Matcher::Regex(r"Checklist:\\n\\n\\nDiff:".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ollama_reply(json!({ "general_assessment": "Trivial." })))
            .create_async()
            .await;
        let post_mock = server
            .mock("POST", "/repos/org/repo/pulls/42/reviews")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 6}"#)
            .create_async()
            .await;

        let env = env_for(&server, CHECKLIST_URL);
        let report = run_review(&env, &settings_for(&server))
            .await
            .unwrap_or_else(|e| panic!("review run with checklist body {body:?}: {e}"));

        assert_eq!(report.files_failed, 0);
        checklist_mock.assert_async().await;
        generate_mock.assert_async().await;
        post_mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_dry_run_does_not_post() {
    let mut server = Server::new_async().await;

    let _diff = server
        .mock("GET", "/repos/org/repo/pulls/42")
        .with_status(200)
        .with_body("diff --git a/a.rs b/a.rs\n+fn a() {}\n")
        .create_async()
        .await;
    let _checklist = server
        .mock("GET", "/api/v3/workspaces/9012/docs/doc-1/pages/page-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"content": "Keep it simple"}"#)
        .create_async()
        .await;
    let _generate = server
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ollama_reply(json!({ "general_assessment": "Fine." })))
        .create_async()
        .await;
    let post_mock = server
        .mock("POST", "/repos/org/repo/pulls/42/reviews")
        .expect(0)
        .create_async()
        .await;

    let env = env_for(&server, CHECKLIST_URL);
    let settings = ReviewSettings {
        dry_run: true,
        ..settings_for(&server)
    };
    let report = run_review(&env, &settings).await.expect("review run");

    assert!(report.payload.is_some());
    assert!(report.github_response.is_none());
    post_mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_diff_posts_nothing() {
    let mut server = Server::new_async().await;

    let _diff = server
        .mock("GET", "/repos/org/repo/pulls/42")
        .with_status(200)
        .with_body("")
        .create_async()
        .await;
    let generate_mock = server
        .mock("POST", "/api/generate")
        .expect(0)
        .create_async()
        .await;
    let post_mock = server
        .mock("POST", "/repos/org/repo/pulls/42/reviews")
        .expect(0)
        .create_async()
        .await;

    let env = env_for(&server, CHECKLIST_URL);
    let report = run_review(&env, &settings_for(&server)).await.expect("review run");

    assert_eq!(report.files_reviewed, 0);
    assert!(report.payload.is_none());
    generate_mock.assert_async().await;
    post_mock.assert_async().await;
}

#[tokio::test]
async fn test_bad_checklist_url_fails_before_any_request() {
    let mut server = Server::new_async().await;
    let diff_mock = server
        .mock("GET", "/repos/org/repo/pulls/42")
        .expect(0)
        .create_async()
        .await;

    let env = env_for(&server, "https://docs.example.com/checklist");
    let err = run_review(&env, &settings_for(&server)).await.unwrap_err();

    assert!(matches!(err, ReviewError::InvalidChecklistUrl(_)));
    diff_mock.assert_async().await;
}

#[tokio::test]
async fn test_diff_fetch_failure_is_fatal() {
    let mut server = Server::new_async().await;
    let _diff = server
        .mock("GET", "/repos/org/repo/pulls/42")
        .with_status(401)
        .with_body(r#"{"message":"Bad credentials"}"#)
        .create_async()
        .await;

    let env = env_for(&server, CHECKLIST_URL);
    let err = run_review(&env, &settings_for(&server)).await.unwrap_err();

    assert!(matches!(err, ReviewError::Api { status: 401, .. }));
}
