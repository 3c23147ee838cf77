use crate::error::{JobError, JobStep};
use crate::upload::api::ensure_success;
use futures::StreamExt;
use reqwest::Url;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// The backend may hand back `/media/...` instead of an absolute URL.
pub fn resolve_download_url(base: &Url, processed_file: &str) -> Result<Url, JobError> {
    match Url::parse(processed_file) {
        Ok(url) => Ok(url),
        Err(_) => base.join(processed_file).map_err(|e| JobError::Decode {
            step: JobStep::Download,
            detail: format!("bad result URL '{processed_file}': {e}"),
        }),
    }
}

/// Streams the result archive to `dest`, returning the number of bytes written.
pub async fn download_to(client: &reqwest::Client, url: Url, dest: &Path) -> Result<u64, JobError> {
    let step = JobStep::Download;
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|source| JobError::Transport { step, source })?;
    let response = ensure_success(step, response).await?;

    let mut file = tokio::fs::File::create(dest).await?;
    let mut written = 0u64;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|source| JobError::Transport { step, source })?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    info!("Downloaded {url} to {} ({written} bytes)", dest.display());
    Ok(written)
}
