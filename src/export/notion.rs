//! Notion exporter: one page per meeting in a configured database.

use crate::config::NotionConfig;
use crate::defaults::{
    NOTION_API_URL, NOTION_API_VERSION, NOTION_MAX_CHILDREN, NOTION_MAX_RICH_TEXT_RUNS,
    NOTION_TEXT_LIMIT,
};
use crate::error::{MinutesError, Result};
use crate::export::{ExportReceipt, MeetingNotes, NotesExporter};
use async_trait::async_trait;
use serde_json::{Value, json};

/// Title property of the target database.
const TITLE_PROPERTY: &str = "Name";

fn export_error(message: String) -> MinutesError {
    MinutesError::Export { message }
}

#[derive(Clone)]
pub struct NotionExporter {
    client: reqwest::Client,
    base_url: String,
    token: String,
    database_id: String,
}

impl std::fmt::Debug for NotionExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionExporter")
            .field("base_url", &self.base_url)
            .field("database_id", &self.database_id)
            .finish_non_exhaustive()
    }
}

impl NotionExporter {
    pub fn new(token: impl Into<String>, database_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: NOTION_API_URL.to_string(),
            token: token.into(),
            database_id: database_id.into(),
        }
    }

    /// # Errors
    /// `ExportNotConfigured` when the token or database id is missing.
    pub fn from_config(config: &NotionConfig) -> Result<Self> {
        let token = config
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| MinutesError::ExportNotConfigured {
                message: "NOTION_TOKEN is not set".to_string(),
            })?;
        let database_id = config
            .database_id
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| MinutesError::ExportNotConfigured {
                message: "NOTION_DATABASE_ID is not set".to_string(),
            })?;
        Ok(Self::new(token, database_id))
    }

    /// Point at a different API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_API_VERSION)
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| export_error(format!("{what}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| export_error(format!("{what}: failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(body);
            return Err(export_error(format!("{what}: Notion returned {status}: {message}")));
        }

        serde_json::from_str(&body).map_err(|e| export_error(format!("{what}: invalid JSON: {e}")))
    }
}

#[async_trait]
impl NotesExporter for NotionExporter {
    async fn export(&self, notes: &MeetingNotes) -> Result<ExportReceipt> {
        notes.validate()?;

        let request = build_page_request(&self.database_id, notes);
        tracing::info!(
            blocks = request.block_count(),
            batches = request.appended.len(),
            title = notes.display_title(),
            "Creating Notion page"
        );

        let response = self
            .send(
                self.request(reqwest::Method::POST, "/v1/pages")
                    .json(&request.body),
                "create page",
            )
            .await?;

        let page_id = response
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| export_error("create page: response has no page id".to_string()))?
            .to_string();
        let url = response
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string);

        let path = format!("/v1/blocks/{page_id}/children");
        for batch in &request.appended {
            self.send(
                self.request(reqwest::Method::PATCH, &path)
                    .json(&json!({ "children": batch })),
                "append blocks",
            )
            .await?;
        }

        tracing::info!(page_id = %page_id, "Notion page created");
        Ok(ExportReceipt { page_id, url })
    }

    async fn verify(&self) -> Result<String> {
        let path = format!("/v1/databases/{}", self.database_id);
        let response = self
            .send(self.request(reqwest::Method::GET, &path), "retrieve database")
            .await?;
        Ok(database_title(&response))
    }

    fn name(&self) -> &str {
        "notion"
    }
}

/// Plain-text title of a database object, or "Unknown".
pub fn database_title(database: &Value) -> String {
    database
        .get("title")
        .and_then(Value::as_array)
        .and_then(|runs| runs.first())
        .and_then(|run| {
            run.pointer("/text/content")
                .or_else(|| run.get("plain_text"))
                .and_then(Value::as_str)
        })
        .unwrap_or("Unknown")
        .to_string()
}

/// Rich-text runs for `text`, split to respect Notion's per-run limit.
fn text_runs(text: &str) -> Vec<Value> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(NOTION_TEXT_LIMIT)
        .map(|chunk| {
            let content: String = chunk.iter().collect();
            json!({ "type": "text", "text": { "content": content } })
        })
        .collect()
}

/// Runs for a single-block field; text past the run cap is dropped.
fn rich_text(text: &str) -> Vec<Value> {
    let mut runs = text_runs(text);
    runs.truncate(NOTION_MAX_RICH_TEXT_RUNS);
    runs
}

fn heading(text: &str) -> Value {
    json!({
        "object": "block",
        "type": "heading_2",
        "heading_2": { "rich_text": rich_text(text) }
    })
}

fn paragraph_block(runs: &[Value]) -> Value {
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": { "rich_text": runs }
    })
}

/// As many paragraphs as `text` needs under the per-block run cap.
fn paragraphs(text: &str) -> Vec<Value> {
    text_runs(text)
        .chunks(NOTION_MAX_RICH_TEXT_RUNS)
        .map(paragraph_block)
        .collect()
}

fn to_do(text: &str) -> Value {
    json!({
        "object": "block",
        "type": "to_do",
        "to_do": { "rich_text": rich_text(text), "checked": false }
    })
}

/// Transcript paragraphs for the toggle, which takes at most one
/// `children` array's worth; the rest is replaced by a marker.
fn transcript_paragraphs(transcript: &str) -> Vec<Value> {
    let mut blocks = paragraphs(transcript);
    if blocks.len() > NOTION_MAX_CHILDREN {
        tracing::warn!(
            paragraphs = blocks.len(),
            kept = NOTION_MAX_CHILDREN - 1,
            "Transcript too long for Notion, truncating"
        );
        blocks.truncate(NOTION_MAX_CHILDREN - 1);
        blocks.push(paragraph_block(&rich_text("[Transcript truncated]")));
    }
    blocks
}

/// Page content, in order: summary, action items as unchecked to-dos, then
/// the transcript folded inside a toggle. Empty sections are skipped.
pub fn page_blocks(notes: &MeetingNotes) -> Vec<Value> {
    let mut children = Vec::new();

    let summary = notes.summary.trim();
    if !summary.is_empty() {
        children.push(heading("Meeting Summary"));
        children.extend(paragraphs(summary));
    }

    let items: Vec<&str> = notes.action_items().collect();
    if !items.is_empty() {
        children.push(heading("Action Items"));
        children.extend(items.into_iter().map(to_do));
    }

    let transcript = notes.transcript.trim();
    if !transcript.is_empty() {
        children.push(heading("Full Transcript"));
        children.push(json!({
            "object": "block",
            "type": "toggle",
            "toggle": {
                "rich_text": rich_text("Click to expand"),
                "children": transcript_paragraphs(transcript)
            }
        }));
    }

    children
}

/// Requests that create one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// Body for `POST /v1/pages`, holding the first batch of blocks.
    pub body: Value,
    /// Further batches for `PATCH /v1/blocks/{page_id}/children`.
    pub appended: Vec<Vec<Value>>,
}

impl PageRequest {
    pub fn block_count(&self) -> usize {
        self.body["children"].as_array().map_or(0, Vec::len)
            + self.appended.iter().map(Vec::len).sum::<usize>()
    }
}

/// Split the page content into a create request and append batches, each
/// within Notion's `children` cap.
pub fn build_page_request(database_id: &str, notes: &MeetingNotes) -> PageRequest {
    let mut blocks = page_blocks(notes);
    let rest = blocks.split_off(blocks.len().min(NOTION_MAX_CHILDREN));
    let appended = rest
        .chunks(NOTION_MAX_CHILDREN)
        .map(<[Value]>::to_vec)
        .collect();

    let mut properties = serde_json::Map::new();
    properties.insert(
        TITLE_PROPERTY.to_string(),
        json!({ "title": rich_text(&format!("Meeting Notes - {}", notes.display_title())) }),
    );

    PageRequest {
        body: json!({
            "parent": { "database_id": database_id },
            "properties": properties,
            "children": blocks
        }),
        appended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes() -> MeetingNotes {
        MeetingNotes {
            title: Some("Planning".to_string()),
            transcript: "We will ship on Monday.".to_string(),
            summary: "Ship Monday".to_string(),
            action_items: vec!["Ship".to_string(), " ".to_string(), "Tell Ana".to_string()],
        }
    }

    #[test]
    fn page_body_has_title_and_sections() {
        let request = build_page_request("db-1", &notes());
        assert!(request.appended.is_empty());
        let body = request.body;

        assert_eq!(body["parent"]["database_id"], "db-1");
        assert_eq!(
            body["properties"]["Name"]["title"][0]["text"]["content"],
            "Meeting Notes - Planning"
        );

        let children = body["children"].as_array().unwrap();
        let types: Vec<&str> = children.iter().map(|b| b["type"].as_str().unwrap()).collect();
        assert_eq!(
            types,
            vec!["heading_2", "paragraph", "heading_2", "to_do", "to_do", "heading_2", "toggle"]
        );
        assert_eq!(children[3]["to_do"]["checked"], false);
        assert_eq!(children[4]["to_do"]["rich_text"][0]["text"]["content"], "Tell Ana");
        assert_eq!(
            children[6]["toggle"]["children"][0]["paragraph"]["rich_text"][0]["text"]["content"],
            "We will ship on Monday."
        );
    }

    #[test]
    fn page_body_default_title() {
        let mut notes = notes();
        notes.title = None;
        let body = build_page_request("db", &notes).body;
        assert_eq!(
            body["properties"]["Name"]["title"][0]["text"]["content"],
            "Meeting Notes - Untitled Meeting"
        );
    }

    #[test]
    fn page_body_skips_empty_sections() {
        let notes = MeetingNotes {
            summary: "Only a summary".to_string(),
            ..Default::default()
        };
        let body = build_page_request("db", &notes).body;
        assert_eq!(body["children"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn long_transcript_is_split_into_runs() {
        let notes = MeetingNotes {
            transcript: "é".repeat(NOTION_TEXT_LIMIT * 2 + 5),
            ..Default::default()
        };
        let body = build_page_request("db", &notes).body;
        let runs = body["children"][1]["toggle"]["children"][0]["paragraph"]["rich_text"]
            .as_array()
            .unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(
            runs[0]["text"]["content"].as_str().unwrap().chars().count(),
            NOTION_TEXT_LIMIT
        );
        assert_eq!(runs[2]["text"]["content"].as_str().unwrap().chars().count(), 5);
    }

    #[test]
    fn many_action_items_are_appended_in_batches() {
        let notes = MeetingNotes {
            summary: "Busy meeting".to_string(),
            transcript: "Lots was said.".to_string(),
            action_items: (0..250).map(|i| format!("Task {i}")).collect(),
            ..Default::default()
        };
        let request = build_page_request("db", &notes);

        // 2 summary + 1 heading + 250 to-dos + 2 transcript blocks
        assert_eq!(request.block_count(), 255);
        let first = request.body["children"].as_array().unwrap();
        assert_eq!(first.len(), NOTION_MAX_CHILDREN);
        let sizes: Vec<usize> = request.appended.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![100, 55]);

        // Order survives the split
        assert_eq!(
            request.appended[0][0]["to_do"]["rich_text"][0]["text"]["content"],
            "Task 97"
        );
        assert_eq!(request.appended[1][54]["type"], "toggle");
    }

    #[test]
    fn huge_transcript_spreads_runs_over_paragraphs() {
        let notes = MeetingNotes {
            transcript: "a".repeat(NOTION_TEXT_LIMIT * 250),
            ..Default::default()
        };
        let body = build_page_request("db", &notes).body;
        let paragraphs = body["children"][1]["toggle"]["children"].as_array().unwrap();
        let runs: Vec<usize> = paragraphs
            .iter()
            .map(|p| p["paragraph"]["rich_text"].as_array().unwrap().len())
            .collect();
        assert_eq!(runs, vec![100, 100, 50]);
    }

    #[test]
    fn transcript_beyond_one_toggle_is_truncated_with_marker() {
        let per_paragraph = NOTION_TEXT_LIMIT * NOTION_MAX_RICH_TEXT_RUNS;
        let paragraphs = transcript_paragraphs(&"a".repeat(per_paragraph * (NOTION_MAX_CHILDREN + 1)));
        assert_eq!(paragraphs.len(), NOTION_MAX_CHILDREN);
        assert_eq!(
            paragraphs[NOTION_MAX_CHILDREN - 1]["paragraph"]["rich_text"][0]["text"]["content"],
            "[Transcript truncated]"
        );
    }

    #[test]
    fn from_config_requires_credentials() {
        let err = NotionExporter::from_config(&NotionConfig::default()).unwrap_err();
        assert!(matches!(err, MinutesError::ExportNotConfigured { .. }));

        let config = NotionConfig {
            token: Some("secret".to_string()),
            database_id: None,
        };
        let err = NotionExporter::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("NOTION_DATABASE_ID"));

        let config = NotionConfig {
            token: Some("secret".to_string()),
            database_id: Some("db".to_string()),
        };
        assert!(NotionExporter::from_config(&config).is_ok());
    }

    #[test]
    fn database_title_reads_first_run() {
        let db = json!({ "title": [{ "text": { "content": "Meetings" }, "plain_text": "Meetings" }] });
        assert_eq!(database_title(&db), "Meetings");
        assert_eq!(database_title(&json!({ "title": [] })), "Unknown");
        assert_eq!(database_title(&json!({})), "Unknown");
    }

    #[tokio::test]
    async fn export_rejects_empty_notes_before_any_request() {
        let exporter = NotionExporter::new("t", "db").with_base_url("http://127.0.0.1:9");
        let err = exporter.export(&MeetingNotes::default()).await.unwrap_err();
        assert!(matches!(err, MinutesError::EmptyInput));
    }

    #[test]
    fn debug_hides_token() {
        let exporter = NotionExporter::new("secret_token", "db");
        assert!(!format!("{exporter:?}").contains("secret_token"));
    }
}
