pub mod presenter;
mod state;
mod ui;

use crate::config::Config;
use crate::error::{JobError, GENERIC_FAILURE_MESSAGE};
use crate::upload::download::{download_to, resolve_download_url};
use crate::upload::{HttpProcessApi, JobClient, JobHandle, ProgressSink, UploadCandidate};
use eframe::{egui, App};
pub use state::{DownloadStatus, Submission, Workflow, WorkflowEvent, WorkflowState};
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Forwards a submission's progress to the UI thread.
struct ChannelSink {
    sender: std_mpsc::Sender<WorkflowEvent>,
    ctx: egui::Context,
}

impl ChannelSink {
    fn send(&self, event: WorkflowEvent) {
        // The receiver is gone only if a newer submission replaced it.
        let _ = self.sender.send(event);
        self.ctx.request_repaint();
    }
}

impl ProgressSink for ChannelSink {
    fn on_upload_progress(&self, percent: u8) {
        self.send(WorkflowEvent::Progress(percent));
    }

    fn on_job_created(&self, job: &JobHandle) {
        self.send(WorkflowEvent::Created(job.clone()));
    }
}

pub struct DatasetMultiplierApp {
    workflow: Workflow,
    client: JobClient<HttpProcessApi>,
    event_receiver: Option<std_mpsc::Receiver<WorkflowEvent>>,
    download: DownloadStatus,
    download_receiver: Option<std_mpsc::Receiver<DownloadStatus>>,
}

impl DatasetMultiplierApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: &Config, client: JobClient<HttpProcessApi>) -> Self {
        info!("Initializing dataset multiplier against {}", client.api().base_url());
        Self {
            workflow: Workflow::new(config.limits.clone(), config.workflow.default_multiplier),
            client,
            event_receiver: None,
            download: DownloadStatus::default(),
            download_receiver: None,
        }
    }

    pub fn select_path(&mut self, path: PathBuf) {
        let _ = self.workflow.select_path(path);
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        // Only the first file counts, like a single-file picker.
        let Some(file) = dropped.into_iter().next() else {
            return;
        };
        if let Some(path) = file.path {
            self.select_path(path);
        } else if let Some(bytes) = file.bytes {
            let _ = self
                .workflow
                .select_file(UploadCandidate::from_bytes(file.name, bytes));
        }
    }

    pub fn reset(&mut self) {
        if self.workflow.reset().is_ok() {
            info!("Resetting application state");
            self.download = DownloadStatus::default();
            self.download_receiver = None;
        }
    }

    pub fn start_submission(&mut self, ctx: &egui::Context) {
        let Submission {
            candidate,
            multiplier,
        } = match self.workflow.begin_submit() {
            Ok(submission) => submission,
            Err(e) => {
                warn!("Submit refused: {e}");
                return;
            }
        };
        self.download = DownloadStatus::default();
        self.download_receiver = None;

        let (sender, receiver) = std_mpsc::channel();
        self.event_receiver = Some(receiver);

        let client = self.client.clone();
        let sink = Arc::new(ChannelSink {
            sender: sender.clone(),
            ctx: ctx.clone(),
        });

        std::thread::spawn(move || {
            let outcome = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt.block_on(client.submit(&candidate, multiplier, sink.clone())),
                Err(e) => Err(JobError::Runtime(e.to_string())),
            };

            let event = match outcome {
                Ok(result) => WorkflowEvent::Completed(result),
                Err(e) => {
                    error!("Submission failed: {e}");
                    WorkflowEvent::Failed(e.user_message())
                }
            };
            sink.send(event);
        });
    }

    pub fn start_download(&mut self, ctx: &egui::Context, processed_file_url: &str) {
        if self.download.is_busy() {
            return;
        }
        let http = self.client.api().client().clone();
        let url = match resolve_download_url(self.client.api().base_url(), processed_file_url) {
            Ok(url) => url,
            Err(e) => {
                self.download = DownloadStatus::Failed(e.to_string());
                return;
            }
        };

        let suggested = url
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "generated_images.zip".to_string());
        let Some(dest) = rfd::FileDialog::new()
            .add_filter("ZIP archive", &["zip"])
            .set_file_name(&suggested)
            .save_file()
        else {
            return;
        };

        let (sender, receiver) = std_mpsc::channel();
        self.download_receiver = Some(receiver);
        self.download = DownloadStatus::InProgress(dest.clone());

        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let outcome = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt.block_on(download_to(&http, url, &dest)),
                Err(e) => Err(JobError::Runtime(e.to_string())),
            };
            let status = match outcome {
                Ok(bytes) => DownloadStatus::Saved { path: dest, bytes },
                Err(e) => {
                    error!("Download failed: {e}");
                    DownloadStatus::Failed(e.user_message())
                }
            };
            let _ = sender.send(status);
            ctx.request_repaint();
        });
    }

    pub fn update_state(&mut self) {
        if let Some(receiver) = &self.event_receiver {
            if self.workflow.drain(receiver) {
                self.event_receiver = None;
            }
        }

        if let Some(receiver) = &self.download_receiver {
            match receiver.try_recv() {
                Ok(status) => {
                    self.download = status;
                    self.download_receiver = None;
                }
                Err(std_mpsc::TryRecvError::Disconnected) => {
                    warn!("Download worker exited without a result");
                    self.download = DownloadStatus::Failed(GENERIC_FAILURE_MESSAGE.to_string());
                    self.download_receiver = None;
                }
                Err(std_mpsc::TryRecvError::Empty) => {}
            }
        }
    }
}

impl App for DatasetMultiplierApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);
        self.update_state();
        self.render(ctx);
    }
}
