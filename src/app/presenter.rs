//! Pure projection of [`WorkflowState`] into what the window shows.

use super::state::WorkflowState;
use crate::upload::download::resolve_download_url;
use crate::upload::JobResult;
use reqwest::Url;
use serde_json::Value;

/// Label for the progress bar, chosen by percentage band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uploading,
    Classifying,
    Generating,
    Finalizing,
}

impl Phase {
    pub fn from_percent(percent: u8) -> Self {
        match percent {
            0..=29 => Self::Uploading,
            30..=69 => Self::Classifying,
            70..=89 => Self::Generating,
            _ => Self::Finalizing,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Uploading => "uploading",
            Self::Classifying => "classifying",
            Self::Generating => "generating",
            Self::Finalizing => "finalizing",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Uploading => "Uploading your ZIP file...",
            Self::Classifying => "Classifying images...",
            Self::Generating => "Generating synthetic images...",
            Self::Finalizing => "Finalizing and creating download...",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuccessView {
    /// `(label, value)` rows, sorted by label.
    pub summary: Vec<(String, String)>,
    pub gan_used: String,
    pub download_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Empty,
    Notice(String),
    Progress { percent: u8, phase: Phase },
    Success(SuccessView),
    Failure(String),
}

pub fn present(state: &WorkflowState, base_url: Option<&Url>) -> View {
    match state {
        WorkflowState::Idle => View::Empty,
        WorkflowState::Invalid(err) => View::Notice(err.user_message()),
        WorkflowState::Uploading(_) | WorkflowState::Processing => {
            let percent = state.progress_percent().unwrap_or(0);
            View::Progress {
                percent,
                phase: Phase::from_percent(percent),
            }
        }
        WorkflowState::Succeeded(result) => View::Success(success_view(result, base_url)),
        WorkflowState::Failed(reason) => View::Failure(reason.clone()),
    }
}

fn success_view(result: &JobResult, base_url: Option<&Url>) -> SuccessView {
    let summary = result
        .classification_summary
        .iter()
        .map(|(label, value)| (label.clone(), format_summary_value(value)))
        .collect();

    let download_url = base_url
        .and_then(|base| resolve_download_url(base, &result.processed_file_url).ok())
        .map(String::from)
        .unwrap_or_else(|| result.processed_file_url.clone());

    SuccessView {
        summary,
        gan_used: result.gan_used.clone(),
        download_url,
    }
}

fn format_summary_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_f64() => n
            .as_f64()
            .map(|f| format!("{f:.1}"))
            .unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}
