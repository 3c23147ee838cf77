use crate::config::Limits;
use crate::error::ValidationError;
use crate::upload::types::UploadCandidate;

/// Gate a candidate on its metadata alone. Archive contents are the
/// backend's business; only the suffix (case-sensitive) and size are
/// checked here.
pub fn validate(candidate: &UploadCandidate, limits: &Limits) -> Result<(), ValidationError> {
    if !candidate.name.ends_with(&limits.accepted_extension) {
        return Err(ValidationError::WrongExtension {
            name: candidate.name.clone(),
            expected: limits.accepted_extension.clone(),
        });
    }

    if candidate.size_bytes > limits.max_upload_bytes {
        return Err(ValidationError::TooLarge {
            size: candidate.size_bytes,
            max: limits.max_upload_bytes,
        });
    }

    Ok(())
}
