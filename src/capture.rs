use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::pipeline::PipelineInput;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to read capture {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid capture JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),
}

/// Read one captured page (title, body text, code fragments) from a JSON file.
pub fn load_capture(path: &Path) -> Result<PipelineInput, CaptureError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CaptureError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let input: PipelineInput =
        serde_json::from_str(&raw).map_err(|source| CaptureError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(
        path = %path.display(),
        fragments = input.fragments.len(),
        body_bytes = input.body_text.len(),
        "loaded capture"
    );
    Ok(input)
}

/// Paths of every `*.json` capture in `dir`, sorted by file name.
pub fn capture_paths(dir: &Path) -> Result<Vec<PathBuf>, CaptureError> {
    if !dir.is_dir() {
        return Err(CaptureError::NotADirectory(dir.to_path_buf()));
    }
    let entries = std::fs::read_dir(dir).map_err(|source| CaptureError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(e) => {
                let path = e.path();
                if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                    paths.push(path);
                }
            }
            Err(e) => warn!("Skipping unreadable entry in {}: {}", dir.display(), e),
        }
    }
    paths.sort();
    Ok(paths)
}

/// Load every capture in `dir`. A broken file fails the whole load.
pub fn load_capture_dir(dir: &Path) -> Result<Vec<(PathBuf, PipelineInput)>, CaptureError> {
    capture_paths(dir)?
        .into_iter()
        .map(|path| load_capture(&path).map(|input| (path, input)))
        .collect()
}

// ── Tests ──
