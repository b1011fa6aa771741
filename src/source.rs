use std::io;
use std::path::Path;

use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::Result;
use crate::error::BuildError;
use crate::layout::ByteSource;

/// Bytes loaded from a source, at most `capacity` long.
#[derive(Debug)]
pub(crate) struct Loaded {
    pub(crate) bytes: Vec<u8>,
    pub(crate) truncated: bool,
}

/// Loads up to `capacity` bytes of `source`.
///
/// Files are read from the start, one byte past `capacity` so truncation can
/// be reported without pulling the rest of the file into memory.
pub(crate) async fn load(placement: &str, source: &ByteSource, capacity: usize) -> Result<Loaded> {
    let mut bytes = match source {
        ByteSource::Inline(bytes) => bytes.clone(),
        ByteSource::File(path) => read_prefix(placement, path, capacity.saturating_add(1)).await?,
    };

    let truncated = bytes.len() > capacity;
    bytes.truncate(capacity);
    Ok(Loaded { bytes, truncated })
}

async fn read_prefix(placement: &str, path: &Path, limit: usize) -> Result<Vec<u8>> {
    let file = File::open(path).await.map_err(|e| BuildError::SourceNotFound {
        placement: placement.to_string(),
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut bytes = Vec::new();
    file.take(limit as u64)
        .read_to_end(&mut bytes)
        .await
        .map_err(|e| io_failure(placement, path, e))?;
    Ok(bytes)
}

pub(crate) fn io_failure(placement: &str, path: &Path, err: io::Error) -> BuildError {
    BuildError::IoFailure {
        placement: placement.to_string(),
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
