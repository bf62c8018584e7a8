//! Export of finished meeting notes to an external notes service.

#[cfg(feature = "notion")]
pub mod notion;

use crate::defaults;
use crate::error::{MinutesError, Result};
use crate::pipeline::types::PipelineResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Everything an exporter receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MeetingNotes {
    pub title: Option<String>,
    pub transcript: String,
    pub summary: String,
    pub action_items: Vec<String>,
}

impl MeetingNotes {
    pub fn from_result(result: &PipelineResult, title: Option<String>) -> Self {
        Self {
            title,
            transcript: result.transcript.text().to_string(),
            summary: result.summary.as_str().to_string(),
            action_items: result
                .action_items
                .iter()
                .map(|i| i.as_str().to_string())
                .collect(),
        }
    }

    /// Caller title, or the default when absent or blank.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(defaults::DEFAULT_MEETING_TITLE)
    }

    /// Non-blank action items, trimmed.
    pub fn action_items(&self) -> impl Iterator<Item = &str> {
        self.action_items
            .iter()
            .map(|i| i.trim())
            .filter(|i| !i.is_empty())
    }

    /// Notes with neither transcript nor summary carry nothing worth exporting.
    pub fn validate(&self) -> Result<()> {
        if self.transcript.trim().is_empty() && self.summary.trim().is_empty() {
            return Err(MinutesError::EmptyInput);
        }
        Ok(())
    }
}

/// Where an exported page ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReceipt {
    pub page_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A notes service that accepts meeting notes.
#[async_trait]
pub trait NotesExporter: Send + Sync {
    async fn export(&self, notes: &MeetingNotes) -> Result<ExportReceipt>;

    /// Check that credentials and target work; returns the target's title.
    async fn verify(&self) -> Result<String>;

    fn name(&self) -> &str;
}
