use thiserror::Error;

/// Failure reported by a thing's per-frame update. The coordinator logs it and
/// carries on with the rest of the tick.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("missing part: {0}")]
    MissingPart(&'static str),
    #[error("{0}")]
    Failed(String),
}

/// Failure of an asynchronous resource load (texture, model, audio).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("unsupported resource {0}")]
    Unsupported(String),
}
