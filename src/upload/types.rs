use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Where the bytes of a candidate live until upload.
#[derive(Debug, Clone)]
pub enum ByteSource {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

impl ByteSource {
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        match self {
            Self::Path(path) => tokio::fs::read(path).await,
            Self::Memory(bytes) => Ok(bytes.to_vec()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadCandidate {
    pub name: String,
    pub source: ByteSource,
    pub size_bytes: u64,
}

impl UploadCandidate {
    pub fn from_path(path: PathBuf) -> std::io::Result<Self> {
        let size_bytes = std::fs::metadata(&path)?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self {
            name,
            source: ByteSource::Path(path),
            size_bytes,
        })
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Arc<[u8]>) -> Self {
        Self {
            name: name.into(),
            size_bytes: bytes.len() as u64,
            source: ByteSource::Memory(bytes),
        }
    }
}

/// Dataset expansion factor. Always within `MIN..=MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Multiplier(u8);

impl Multiplier {
    pub const MIN: u8 = 2;
    pub const MAX: u8 = 20;
    pub const DEFAULT: u8 = 5;

    pub fn new(value: i64) -> Option<Self> {
        (i64::from(Self::MIN)..=i64::from(Self::MAX))
            .contains(&value)
            .then(|| Self(value as u8))
    }

    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(i64::from(Self::MIN), i64::from(Self::MAX)) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Multiplier {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl<'de> Deserialize<'de> for Multiplier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Self::new(raw).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "multiplier {raw} outside {}..={}",
                Self::MIN,
                Self::MAX
            ))
        })
    }
}

impl std::fmt::Display for Multiplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-assigned job id. The backend hands out integers, but the client
/// treats it as opaque text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub id: String,
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

/// Accepts `"id": 42` as well as `"id": "42"`.
pub(crate) fn id_from_value(value: &Value) -> Option<JobHandle> {
    match value {
        Value::String(s) if !s.is_empty() => Some(JobHandle { id: s.clone() }),
        Value::Number(n) => Some(JobHandle { id: n.to_string() }),
        _ => None,
    }
}

/// Body of `GET /processes/{id}/`. Every field is optional because the
/// record exists before processing has filled it in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub classification_summary: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub gan_used: Option<String>,
    #[serde(default)]
    pub processed_file: Option<String>,
}

impl JobRecord {
    pub fn is_complete(&self) -> bool {
        self.processed_file.as_deref().is_some_and(|f| !f.is_empty())
            && self.gan_used.as_deref().is_some_and(|g| !g.is_empty())
    }

    pub fn into_result(self) -> Option<JobResult> {
        if !self.is_complete() {
            return None;
        }
        Some(JobResult {
            classification_summary: self.classification_summary.unwrap_or_default(),
            gan_used: self.gan_used?,
            processed_file_url: self.processed_file?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    pub classification_summary: BTreeMap<String, Value>,
    pub gan_used: String,
    pub processed_file_url: String,
}

impl JobResult {
    /// Integer count for a class label, if the summary holds one.
    pub fn count(&self, label: &str) -> Option<u64> {
        self.classification_summary.get(label).and_then(Value::as_u64)
    }
}
