use thiserror::Error;

/// Errors surfaced by the guidance core.
///
/// Transient garbage frames are NOT errors: detection and quality analysis
/// degrade to null/neutral results instead, so per-frame callers never need
/// error handling for routine camera noise. These variants cover caller
/// mistakes (bad configuration) and file-level failures.
#[derive(Debug, Error)]
pub enum GuidanceError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("configuration file error: {0}")]
    ConfigFile(String),

    #[error("analysis task failed: {0}")]
    AnalysisTask(String),
}
