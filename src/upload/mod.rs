pub mod api;
pub mod download;
mod job_client;
mod types;
pub mod validator;

pub use api::{HttpProcessApi, ProcessApi, ProgressSink};
pub use job_client::{JobClient, PollPolicy};
pub use types::{ByteSource, JobHandle, JobRecord, JobResult, Multiplier, UploadCandidate};
pub use validator::validate;
