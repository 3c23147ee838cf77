use async_trait::async_trait;
use dataset_multiplier::app::{Workflow, WorkflowEvent, WorkflowState};
use dataset_multiplier::config::Limits;
use dataset_multiplier::error::{JobError, JobStep, GENERIC_FAILURE_MESSAGE};
use dataset_multiplier::upload::{
    ByteSource, JobClient, JobHandle, JobRecord, Multiplier, PollPolicy, ProcessApi, ProgressSink,
    UploadCandidate,
};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Create { name: String, multiplier: u8 },
    Trigger(String),
    Fetch(String),
}

/// Scripted backend: records calls, replays canned outcomes.
#[derive(Default)]
struct FakeApi {
    calls: Mutex<Vec<Call>>,
    create: Mutex<Option<Result<JobHandle, JobError>>>,
    trigger_fails: Option<(u16, Option<String>)>,
    records: Mutex<VecDeque<JobRecord>>,
}

impl FakeApi {
    fn creating(id: &str) -> Self {
        let api = Self::default();
        *api.create.lock().unwrap() = Some(Ok(JobHandle { id: id.into() }));
        api
    }

    fn with_records(self, records: Vec<JobRecord>) -> Self {
        *self.records.lock().unwrap() = records.into();
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessApi for FakeApi {
    async fn create_job(
        &self,
        candidate: &UploadCandidate,
        multiplier: Multiplier,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<JobHandle, JobError> {
        self.calls.lock().unwrap().push(Call::Create {
            name: candidate.name.clone(),
            multiplier: multiplier.get(),
        });
        for percent in [10, 35, 35, 80] {
            sink.on_upload_progress(percent);
        }
        self.create
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(JobError::Read(std::io::Error::other("no script"))))
    }

    async fn start_processing(&self, job: &JobHandle) -> Result<(), JobError> {
        self.calls.lock().unwrap().push(Call::Trigger(job.id.clone()));
        match &self.trigger_fails {
            Some((status, message)) => Err(JobError::Server {
                step: JobStep::Trigger,
                status: *status,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn fetch_job(&self, job: &JobHandle) -> Result<JobRecord, JobError> {
        self.calls.lock().unwrap().push(Call::Fetch(job.id.clone()));
        let mut records = self.records.lock().unwrap();
        // The last record repeats once the script runs out.
        if records.len() > 1 {
            Ok(records.pop_front().unwrap_or_default())
        } else {
            Ok(records.front().cloned().unwrap_or_default())
        }
    }
}

/// Collects events exactly as the app's channel would.
#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<WorkflowEvent>>,
}

impl ProgressSink for RecordingSink {
    fn on_upload_progress(&self, percent: u8) {
        self.events.lock().unwrap().push(WorkflowEvent::Progress(percent));
    }

    fn on_job_created(&self, job: &JobHandle) {
        self.events.lock().unwrap().push(WorkflowEvent::Created(job.clone()));
    }
}

fn photos_zip() -> UploadCandidate {
    UploadCandidate {
        name: "photos.zip".into(),
        source: ByteSource::Memory(Arc::from(vec![0u8; 16])),
        size_bytes: 5 * 1024 * 1024,
    }
}

fn complete_record() -> JobRecord {
    serde_json::from_value(json!({
        "id": 42,
        "classification_summary": {"cat": 10, "dog": 8},
        "gan_used": "StyleGAN",
        "processed_file": "https://x/out.zip"
    }))
    .unwrap()
}

fn pending_record() -> JobRecord {
    serde_json::from_value(json!({
        "id": 42,
        "classification_summary": null,
        "gan_used": null,
        "processed_file": null
    }))
    .unwrap()
}

fn fast_polling(deadline: Duration) -> PollPolicy {
    PollPolicy {
        initial_interval: Duration::from_millis(1),
        max_interval: Duration::from_millis(4),
        backoff_factor: 2.0,
        deadline,
    }
}

/// Drives a workflow through one submission the way the app does.
async fn run_workflow(api: FakeApi, poll: PollPolicy) -> (Workflow, Arc<RecordingSink>, JobClient<FakeApi>) {
    let mut workflow = Workflow::new(Limits::default(), Multiplier::default());
    workflow.select_file(photos_zip()).unwrap();
    let submission = workflow.begin_submit().unwrap();
    assert_eq!(workflow.state(), &WorkflowState::Uploading(0));

    let client = JobClient::new(api, poll);
    let sink = Arc::new(RecordingSink::default());
    let outcome = client
        .submit(&submission.candidate, submission.multiplier, sink.clone())
        .await;

    let mut events = sink.events.lock().unwrap().clone();
    events.push(match outcome {
        Ok(result) => WorkflowEvent::Completed(result),
        Err(e) => WorkflowEvent::Failed(e.user_message()),
    });
    for event in events {
        workflow.apply(event);
    }
    (workflow, sink, client)
}

#[tokio::test]
async fn all_three_calls_succeed() {
    let api = FakeApi::creating("42").with_records(vec![complete_record()]);
    let (workflow, sink, client) = run_workflow(api, fast_polling(Duration::from_secs(5))).await;

    let WorkflowState::Succeeded(result) = workflow.state() else {
        panic!("expected Succeeded, got {:?}", workflow.state());
    };
    assert_eq!(result.count("cat"), Some(10));
    assert_eq!(result.count("dog"), Some(8));
    assert_eq!(result.gan_used, "StyleGAN");
    assert_eq!(result.processed_file_url, "https://x/out.zip");
    assert_eq!(workflow.job().map(|j| j.id.as_str()), Some("42"));

    assert_eq!(
        client.api().calls(),
        vec![
            Call::Create {
                name: "photos.zip".into(),
                multiplier: 5
            },
            Call::Trigger("42".into()),
            Call::Fetch("42".into()),
        ]
    );

    let events = sink.events.lock().unwrap().clone();
    assert_eq!(events.last(), Some(&WorkflowEvent::Created(JobHandle { id: "42".into() })));
}

#[tokio::test]
async fn progress_seen_by_workflow_is_monotonic() {
    let api = FakeApi::creating("7").with_records(vec![complete_record()]);
    let mut workflow = Workflow::new(Limits::default(), Multiplier::default());
    workflow.select_file(photos_zip()).unwrap();
    let submission = workflow.begin_submit().unwrap();

    let client = JobClient::new(api, fast_polling(Duration::from_secs(5)));
    let sink = Arc::new(RecordingSink::default());
    client
        .submit(&submission.candidate, submission.multiplier, sink.clone())
        .await
        .unwrap();

    let mut seen = vec![];
    for event in sink.events.lock().unwrap().clone() {
        workflow.apply(event);
        if let Some(p) = workflow.state().progress_percent() {
            seen.push(p);
        }
    }
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "progress regressed: {seen:?}");
    assert_eq!(seen.last(), Some(&100));
    assert_eq!(workflow.state(), &WorkflowState::Processing);
}

#[tokio::test]
async fn create_failure_skips_trigger_and_fetch() {
    let api = FakeApi::default();
    *api.create.lock().unwrap() = Some(Err(JobError::Server {
        step: JobStep::Create,
        status: 400,
        message: Some("Only ZIP files are supported".into()),
    }));
    let (workflow, _, client) = run_workflow(api, fast_polling(Duration::from_secs(5))).await;

    assert_eq!(
        workflow.state(),
        &WorkflowState::Failed("Only ZIP files are supported".into())
    );
    assert_eq!(client.api().calls().len(), 1);
    assert!(matches!(client.api().calls()[0], Call::Create { .. }));
}

#[tokio::test]
async fn trigger_failure_without_message_uses_generic_text() {
    let mut api = FakeApi::creating("3");
    api.trigger_fails = Some((500, None));
    let (workflow, _, client) = run_workflow(api, fast_polling(Duration::from_secs(5))).await;

    assert_eq!(
        workflow.state(),
        &WorkflowState::Failed(GENERIC_FAILURE_MESSAGE.into())
    );
    assert_eq!(
        client.api().calls(),
        vec![
            Call::Create {
                name: "photos.zip".into(),
                multiplier: 5
            },
            Call::Trigger("3".into()),
        ]
    );
}

#[tokio::test]
async fn polls_until_record_is_complete() {
    let api = FakeApi::creating("42").with_records(vec![
        pending_record(),
        pending_record(),
        complete_record(),
    ]);
    let (workflow, _, client) = run_workflow(api, fast_polling(Duration::from_secs(5))).await;

    assert!(matches!(workflow.state(), WorkflowState::Succeeded(_)));
    let fetches = client
        .api()
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Fetch(_)))
        .count();
    assert_eq!(fetches, 3);
}

#[tokio::test]
async fn never_completing_job_fails_at_deadline() {
    let api = FakeApi::creating("42").with_records(vec![pending_record()]);
    let (workflow, _, client) = run_workflow(api, fast_polling(Duration::from_millis(30))).await;

    let WorkflowState::Failed(reason) = workflow.state() else {
        panic!("expected Failed, got {:?}", workflow.state());
    };
    assert!(reason.starts_with("Processing did not finish"), "{reason}");
    assert!(client.api().calls().len() >= 3);
}

#[tokio::test]
async fn resubmitting_creates_a_new_job() {
    let api = FakeApi::creating("1").with_records(vec![complete_record()]);
    let (mut workflow, _, client) = run_workflow(api, fast_polling(Duration::from_secs(5))).await;
    assert!(matches!(workflow.state(), WorkflowState::Succeeded(_)));

    let submission = workflow.begin_submit().unwrap();
    assert_eq!(workflow.state(), &WorkflowState::Uploading(0));
    assert!(workflow.job().is_none());

    *client.api().create.lock().unwrap() = Some(Ok(JobHandle { id: "2".into() }));
    let sink = Arc::new(RecordingSink::default());
    client
        .submit(&submission.candidate, submission.multiplier, sink)
        .await
        .unwrap();
    let creates = client
        .api()
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Create { .. }))
        .count();
    assert_eq!(creates, 2);
}

#[test]
fn wrong_extension_makes_no_calls() {
    let api = FakeApi::creating("42");
    let mut workflow = Workflow::new(Limits::default(), Multiplier::default());
    let notes = UploadCandidate {
        name: "notes.txt".into(),
        source: ByteSource::Memory(Arc::from(Vec::new())),
        size_bytes: 12,
    };
    assert!(workflow.select_file(notes).is_err());
    assert!(matches!(workflow.state(), WorkflowState::Invalid(_)));
    assert!(workflow.begin_submit().is_err());
    assert!(api.calls().is_empty());
}
