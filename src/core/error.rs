//! Errors reported by a render session.

// std
use std::collections::TryReserveError;
// others
use thiserror::Error;
// wavefront
use crate::core::display::BufferType;
use crate::core::parallel::Stage;

pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Error, Debug)]
pub enum RenderError {
    /// Working storage could not be reserved
    #[error("allocation of {buffer} failed: {source}")]
    Allocation {
        buffer: &'static str,
        #[source]
        source: TryReserveError,
    },

    /// The worker pool could not be created
    #[error("thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A stage panicked on one of the workers
    #[error("stage {stage} panicked")]
    StagePanicked { stage: Stage },

    /// Rejected session configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Buffer name that maps to no buffer type
    #[error("unknown buffer: {0}")]
    UnknownBuffer(String),

    /// Buffer whose content has not been produced yet
    #[error("buffer {0} is not available yet")]
    BufferUnavailable(BufferType),

    #[error("light count {requested} exceeds the {available} lights of the scene")]
    LightCountMismatch { requested: usize, available: usize },

    /// Destination does not match the film resolution
    #[error("expected {expected} pixels, got {actual}")]
    ResolutionMismatch { expected: usize, actual: usize },
}

impl RenderError {
    /// Runtime failures end the session; logical errors leave it
    /// usable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RenderError::Allocation { .. }
                | RenderError::ThreadPool(_)
                | RenderError::StagePanicked { .. }
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn runtime_errors_are_fatal() {
        assert!(RenderError::StagePanicked {
            stage: Stage::Shade
        }
        .is_fatal());
        assert!(!RenderError::UnknownBuffer("depth".to_string()).is_fatal());
        assert!(!RenderError::BufferUnavailable(BufferType::FilteredFull).is_fatal());
        let e = RenderError::LightCountMismatch {
            requested: 3,
            available: 2,
        };
        assert_eq!(
            e.to_string(),
            "light count 3 exceeds the 2 lights of the scene"
        );
    }
}
