//! Error types shared by the upload workflow.

use crate::upload::JobHandle;
use std::time::Duration;
use thiserror::Error;

/// Shown whenever a remote step fails without a server-provided message.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "An error occurred while processing your file. Please try again.";

/// Rejections raised locally, before anything touches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("wrong extension: '{name}' is not a {expected} archive")]
    WrongExtension { name: String, expected: String },

    #[error("file too large: {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: u64, max: u64 },

    #[error("no file selected")]
    MissingFile,

    #[error("cannot read '{name}': {reason}")]
    Unreadable { name: String, reason: String },

    #[error("a submission is already in progress")]
    Busy,
}

impl ValidationError {
    /// Inline text for the form.
    pub fn user_message(&self) -> String {
        match self {
            Self::WrongExtension { .. } => {
                "Please upload a ZIP file containing images (.png, .jpg, .jpeg).".to_string()
            }
            Self::TooLarge { size, max } => format!(
                "This file is {}. The maximum upload size is {}.",
                crate::utils::file_size::format_size(*size),
                crate::utils::file_size::format_size(*max)
            ),
            Self::MissingFile => "Please select a ZIP file to upload.".to_string(),
            Self::Unreadable { name, .. } => {
                format!("Could not read '{name}'. Please choose the file again.")
            }
            Self::Busy => "Please wait for the current submission to finish.".to_string(),
        }
    }
}

/// Which of the three remote calls a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStep {
    Create,
    Trigger,
    Fetch,
    Download,
}

impl std::fmt::Display for JobStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Create => "create job",
            Self::Trigger => "start processing",
            Self::Fetch => "fetch result",
            Self::Download => "download result",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to read upload: {0}")]
    Read(#[from] std::io::Error),

    #[error("{step} request failed: {source}")]
    Transport {
        step: JobStep,
        #[source]
        source: reqwest::Error,
    },

    #[error("{step} returned status {status}{}", message_suffix(.message))]
    Server {
        step: JobStep,
        status: u16,
        message: Option<String>,
    },

    #[error("{step} returned an unexpected body: {detail}")]
    Decode { step: JobStep, detail: String },

    #[error("job {job} was not complete after {waited:?}")]
    NotReady { job: JobHandle, waited: Duration },

    #[error(transparent)]
    Rejected(#[from] ValidationError),

    #[error("could not start async runtime: {0}")]
    Runtime(String),
}

fn message_suffix(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

impl JobError {
    /// Text surfaced in the Failed state: the server's own message when it
    /// sent one, the generic retry prompt otherwise.
    pub fn user_message(&self) -> String {
        match self {
            Self::Server {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            Self::Rejected(err) => err.user_message(),
            Self::NotReady { waited, .. } => format!(
                "Processing did not finish within {} seconds. Please try again.",
                waited.as_secs()
            ),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn step(&self) -> Option<JobStep> {
        match self {
            Self::Transport { step, .. } | Self::Server { step, .. } | Self::Decode { step, .. } => {
                Some(*step)
            }
            Self::NotReady { .. } => Some(JobStep::Fetch),
            Self::Read(_) | Self::Rejected(_) | Self::Runtime(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
