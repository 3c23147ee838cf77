use crate::config::Limits;
use crate::error::{ValidationError, GENERIC_FAILURE_MESSAGE};
use crate::upload::{validate, JobHandle, JobResult, Multiplier, UploadCandidate};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use tracing::{debug, info, warn};

/// Observable state of the upload workflow. Exactly one holds at a time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    Invalid(ValidationError),
    Uploading(u8),
    Processing,
    Succeeded(JobResult),
    Failed(String),
}

impl WorkflowState {
    /// A submission is in flight.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Uploading(_) | Self::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }

    /// Percentage to show on the progress bar while active. Processing
    /// reports 100: the upload is done and the server is working.
    pub fn progress_percent(&self) -> Option<u8> {
        match self {
            Self::Uploading(p) => Some(*p),
            Self::Processing => Some(100),
            _ => None,
        }
    }
}

/// Messages from a submission's worker thread. A submission emits exactly
/// one of `Completed` / `Failed`, last.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    Progress(u8),
    Created(JobHandle),
    Completed(JobResult),
    Failed(String),
}

/// Everything a worker needs to run one submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub candidate: UploadCandidate,
    pub multiplier: Multiplier,
}

/// Single source of truth for selection, multiplier and workflow state.
/// Input that conflicts with an active submission is refused.
#[derive(Debug, Clone)]
pub struct Workflow {
    limits: Limits,
    candidate: Option<UploadCandidate>,
    multiplier: Multiplier,
    state: WorkflowState,
    job: Option<JobHandle>,
}

impl Workflow {
    pub fn new(limits: Limits, multiplier: Multiplier) -> Self {
        Self {
            limits,
            candidate: None,
            multiplier,
            state: WorkflowState::Idle,
            job: None,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn candidate(&self) -> Option<&UploadCandidate> {
        self.candidate.as_ref()
    }

    pub fn multiplier(&self) -> Multiplier {
        self.multiplier
    }

    /// Job the current (or last) submission created, once known.
    pub fn job(&self) -> Option<&JobHandle> {
        self.job.as_ref()
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn can_submit(&self) -> bool {
        self.candidate.is_some() && !self.state.is_active()
    }

    /// A file was picked or dropped. Replaces any held candidate.
    pub fn select_file(&mut self, candidate: UploadCandidate) -> Result<(), ValidationError> {
        if self.state.is_active() {
            warn!("Ignoring file '{}' while a submission is active", candidate.name);
            return Err(ValidationError::Busy);
        }

        if let Err(err) = validate(&candidate, &self.limits) {
            warn!("Rejected '{}': {err}", candidate.name);
            self.candidate = None;
            self.state = WorkflowState::Invalid(err.clone());
            return Err(err);
        }

        info!("Selected '{}' ({} bytes)", candidate.name, candidate.size_bytes);
        self.candidate = Some(candidate);
        if matches!(self.state, WorkflowState::Invalid(_) | WorkflowState::Failed(_)) {
            self.state = WorkflowState::Idle;
        }
        Ok(())
    }

    /// A file was picked from disk. A file that cannot be stat'ed is
    /// surfaced as `Invalid` and drops any previously held candidate.
    pub fn select_path(&mut self, path: PathBuf) -> Result<(), ValidationError> {
        if self.state.is_active() {
            warn!("Ignoring {} while a submission is active", path.display());
            return Err(ValidationError::Busy);
        }
        match UploadCandidate::from_path(path.clone()) {
            Ok(candidate) => self.select_file(candidate),
            Err(e) => {
                warn!("Could not read {}: {e}", path.display());
                let err = ValidationError::Unreadable {
                    name: path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| path.display().to_string()),
                    reason: e.to_string(),
                };
                self.candidate = None;
                self.state = WorkflowState::Invalid(err.clone());
                Err(err)
            }
        }
    }

    /// Out-of-range values are clamped to `Multiplier::MIN..=Multiplier::MAX`.
    pub fn set_multiplier(&mut self, value: i64) -> Result<Multiplier, ValidationError> {
        if self.state.is_active() {
            return Err(ValidationError::Busy);
        }
        self.multiplier = Multiplier::clamped(value);
        Ok(self.multiplier)
    }

    /// Starts a submission: `Uploading(0)`, prior result or error dropped.
    /// A refusal for `Busy` leaves state untouched; any other refusal is
    /// surfaced as `Invalid`.
    pub fn begin_submit(&mut self) -> Result<Submission, ValidationError> {
        if self.state.is_active() {
            warn!("Submit refused: a submission is already active");
            return Err(ValidationError::Busy);
        }

        let Some(candidate) = self.candidate.clone() else {
            self.state = WorkflowState::Invalid(ValidationError::MissingFile);
            return Err(ValidationError::MissingFile);
        };

        if let Err(err) = validate(&candidate, &self.limits) {
            self.candidate = None;
            self.state = WorkflowState::Invalid(err.clone());
            return Err(err);
        }

        self.job = None;
        self.state = WorkflowState::Uploading(0);
        info!("Submission started for '{}'", candidate.name);
        Ok(Submission {
            candidate,
            multiplier: self.multiplier,
        })
    }

    /// Folds one worker event into the state. Returns whether anything
    /// changed; events that do not fit the current state are dropped.
    pub fn apply(&mut self, event: WorkflowEvent) -> bool {
        let next = match (&self.state, event) {
            (WorkflowState::Uploading(current), WorkflowEvent::Progress(percent)) => {
                let percent = percent.min(100);
                if percent <= *current {
                    return false;
                }
                debug!("Upload progress {percent}%");
                WorkflowState::Uploading(percent)
            }
            (WorkflowState::Uploading(_), WorkflowEvent::Created(job)) => {
                self.job = Some(job);
                WorkflowState::Processing
            }
            (WorkflowState::Uploading(_) | WorkflowState::Processing, WorkflowEvent::Completed(result)) => {
                info!("Submission succeeded ({})", result.gan_used);
                WorkflowState::Succeeded(result)
            }
            (WorkflowState::Uploading(_) | WorkflowState::Processing, WorkflowEvent::Failed(reason)) => {
                warn!("Submission failed: {reason}");
                WorkflowState::Failed(reason)
            }
            (state, event) => {
                debug!("Dropping {event:?} in state {state:?}");
                return false;
            }
        };
        self.state = next;
        true
    }

    /// Applies every queued worker event. Returns true once the receiver is
    /// spent: the workflow reached a terminal state, or the worker hung up
    /// without reporting one, in which case the submission is failed.
    pub fn drain(&mut self, receiver: &Receiver<WorkflowEvent>) -> bool {
        loop {
            match receiver.try_recv() {
                Ok(event) => {
                    self.apply(event);
                }
                Err(TryRecvError::Empty) => return self.state.is_terminal(),
                Err(TryRecvError::Disconnected) => {
                    if self.state.is_active() {
                        warn!("Worker exited without a result");
                        self.apply(WorkflowEvent::Failed(GENERIC_FAILURE_MESSAGE.to_string()));
                    }
                    return true;
                }
            }
        }
    }

    /// "Start over": forget the selection and any outcome.
    pub fn reset(&mut self) -> Result<(), ValidationError> {
        if self.state.is_active() {
            return Err(ValidationError::Busy);
        }
        self.candidate = None;
        self.job = None;
        self.state = WorkflowState::Idle;
        Ok(())
    }
}

/// Where a "Save as..." of the result archive stands.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DownloadStatus {
    #[default]
    NotStarted,
    InProgress(PathBuf),
    Saved { path: PathBuf, bytes: u64 },
    Failed(String),
}

impl DownloadStatus {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::InProgress(_))
    }

    pub fn get_status_text(&self) -> String {
        match self {
            Self::NotStarted => String::new(),
            Self::InProgress(path) => format!("⏳ Saving to {}...", path.display()),
            Self::Saved { path, bytes } => format!(
                "✅ Saved {} to {}",
                crate::utils::file_size::format_size(*bytes),
                path.display()
            ),
            Self::Failed(reason) => format!("❌ Download failed: {reason}"),
        }
    }
}
