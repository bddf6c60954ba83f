use vkshim_protocol::{RealId, Status, SurrogateId};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The caller asked to wrap a real identity that is already live in the
    /// map. Never corrected silently: it means the caller is reusing a real
    /// identity whose previous wrapping was not retired.
    #[error("real identity {0:?} is already wrapped")]
    AlreadyWrapped(RealId),

    #[error("no template layout registered for {0:?}")]
    UnknownTemplate(SurrogateId),

    #[error("template entry reads past the end of the supplied buffer (offset {offset}, need {need}, have {have})")]
    TemplateOutOfBounds {
        offset: usize,
        need: usize,
        have: usize,
    },

    #[error("failed to reserve {bytes} bytes for a rewritten argument buffer")]
    Exhausted { bytes: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// The interface status code this failure surfaces as. The layer never
    /// invents status codes of its own.
    pub fn status(&self) -> Status {
        match self {
            CoreError::Exhausted { .. } => Status::ErrorOutOfHostMemory,
            CoreError::AlreadyWrapped(_)
            | CoreError::UnknownTemplate(_)
            | CoreError::TemplateOutOfBounds { .. } => Status::ErrorInvalidUsage,
            CoreError::Config(_) | CoreError::Io(_) => Status::ErrorUnknown,
        }
    }
}
