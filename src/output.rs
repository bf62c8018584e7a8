//! Terminal rendering of results, health and model listings.
//!
//! Renderers return strings so the binary decides where they go.

use crate::backend::HealthStatus;
use crate::error::{MinutesError, Result};
use crate::export::ExportReceipt;
use crate::models::catalog::{ModelSize, list_models};
use crate::models::generator_catalog::list_generator_models;
use crate::pipeline::{PipelineResult, StageMethod, StageReport, StageStatus, Transcript};
use crate::stt::whisper;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::Path;

/// Pretty JSON for `--json`.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| MinutesError::Other(format!("Failed to serialize output: {e}")))
}

fn method_label(method: Option<StageMethod>) -> &'static str {
    match method {
        Some(StageMethod::Model) => "model",
        Some(StageMethod::Rules) => "rules",
        Some(StageMethod::Placeholder) => "placeholder",
        None => "none",
    }
}

fn status_label(status: StageStatus) -> String {
    match status {
        StageStatus::Succeeded => "ok".green().to_string(),
        StageStatus::Degraded => "degraded".yellow().to_string(),
        StageStatus::Failed => "failed".red().to_string(),
    }
}

fn stage_line(out: &mut String, name: &str, report: &StageReport) {
    out.push_str(&format!(
        "  {:<14} {} via {} ({} ms)",
        format!("{name}:").dimmed(),
        status_label(report.status),
        method_label(report.method),
        report.elapsed_ms
    ));
    if let Some(note) = &report.note {
        out.push_str(&format!(" {}", format!("- {note}").dimmed()));
    }
    out.push('\n');
}

pub fn render_transcript(transcript: &Transcript) -> String {
    let mut out = String::new();
    if let Some(language) = transcript.language() {
        out.push_str(&format!("{} {}\n", "Language:".dimmed(), language));
    }
    out.push_str(&format!("{}\n", transcript.text()));
    out
}

/// Summary, action items, then the transcript and a per-stage footer.
pub fn render_result(result: &PipelineResult) -> String {
    let mut out = String::new();

    out.push_str(&format!("{}\n", "Summary".bold()));
    out.push_str(&format!("{}\n\n", result.summary));

    out.push_str(&format!("{}\n", "Action Items".bold()));
    for item in &result.action_items {
        out.push_str(&format!("  {} {}\n", "☐".green(), item));
    }
    out.push('\n');

    out.push_str(&format!("{}\n", "Transcript".bold()));
    out.push_str(&render_transcript(&result.transcript));
    out.push('\n');

    out.push_str(&format!("{}\n", "Stages".bold()));
    if let Some(report) = &result.stages.transcription {
        stage_line(&mut out, "transcription", report);
    }
    stage_line(&mut out, "summary", &result.stages.summarization);
    stage_line(&mut out, "action items", &result.stages.action_items);

    let engine = result
        .engine
        .map(|e| e.to_string())
        .unwrap_or_else(|| "n/a".to_string());
    out.push_str(&format!(
        "  {:<14} {}, {} ms total\n",
        "engine:".dimmed(),
        engine,
        result.total_ms()
    ));
    if result.is_degraded() {
        out.push_str(&format!("{}\n", "Some stages used fallbacks.".yellow()));
    }
    out
}

fn loaded(flag: bool) -> String {
    if flag {
        "loaded".green().to_string()
    } else {
        "not loaded".dimmed().to_string()
    }
}

pub fn render_health(health: &HealthStatus) -> String {
    let mut out = String::new();
    let transcription = if health.transcription_loaded {
        format!(
            "{} ({} engine, model {})",
            "loaded".green(),
            health.transcription_engine,
            health.transcription_model.as_deref().unwrap_or("unknown")
        )
    } else {
        "not loaded".red().to_string()
    };
    out.push_str(&format!("  {}  {}\n", "Transcription:".dimmed(), transcription));
    out.push_str(&format!(
        "  {}     {}\n",
        "Summarizer:".dimmed(),
        loaded(health.summarizer_loaded)
    ));
    out.push_str(&format!(
        "  {}   {}\n",
        "Action items:".dimmed(),
        loaded(health.action_extractor_loaded)
    ));
    out
}

/// Whisper and text-generation catalogs with local install state.
pub fn render_models(current: &str, ceiling: Option<ModelSize>, model_dir: &Path) -> String {
    let mut out = String::new();
    out.push_str(&format!("Transcription models (current: {}):\n", current.green()));
    for model in list_models() {
        let marker = if model.name == current {
            "●".green().to_string()
        } else {
            " ".to_string()
        };
        let installed = if whisper::model_path(model_dir, model.ggml_filename).exists() {
            "ggml installed".green().to_string()
        } else {
            "ggml not installed".dimmed().to_string()
        };
        let allowed = match ceiling {
            Some(max) if model.size > max => format!(" {}", "(above ceiling)".yellow()),
            _ => String::new(),
        };
        let lang = if model.english_only { "en" } else { "multi" };
        out.push_str(&format!(
            "  {} {:<10} {:>5} MB  {:<5}  {}{}\n",
            marker, model.name, model.size_mb, lang, installed, allowed
        ));
    }

    out.push_str("\nText models:\n");
    for model in list_generator_models() {
        out.push_str(&format!(
            "    {:<14} {:>5} MB  {}\n",
            model.name,
            model.size_mb,
            model.hf_repo.dimmed()
        ));
    }
    out
}

pub fn render_receipt(receipt: &ExportReceipt) -> String {
    match &receipt.url {
        Some(url) => format!("{} {}", "Exported:".green(), url),
        None => format!("{} page {}", "Exported:".green(), receipt.page_id),
    }
}
