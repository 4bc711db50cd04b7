//! Carga de definiciones de workflow desde archivos JSON.
use std::fs;
use std::path::{Path, PathBuf};

use cert_domain::Workflow;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read workflow file {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("invalid workflow file {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("workflow file {0} has no nodes")]
    Empty(PathBuf),
}

pub fn load_workflow(path: &Path) -> Result<Workflow, LoadError> {
    let raw = fs::read_to_string(path).map_err(|source| LoadError::Io { path: path.to_path_buf(),
                                                                           source })?;
    parse_workflow(&raw).map_err(|source| LoadError::Parse { path: path.to_path_buf(),
                                                             source })
                        .and_then(|wf| {
                            if wf.nodes.is_empty() {
                                Err(LoadError::Empty(path.to_path_buf()))
                            } else {
                                Ok(wf)
                            }
                        })
}

pub fn parse_workflow(raw: &str) -> Result<Workflow, serde_json::Error> {
    serde_json::from_str(raw)
}
