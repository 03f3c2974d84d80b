// Error types surfaced by the application coordinator

use thiserror::Error;

use crate::audio::CaptureError;
use crate::database::StorageError;
use crate::llm_engine::AnalysisError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("notebook name cannot be empty")]
    EmptyNotebookName,

    #[error("no notebook is selected")]
    NoActiveNotebook,

    #[error("notebook {0} does not exist")]
    UnknownNotebook(String),

    #[error("recording {0} does not exist")]
    UnknownRecording(String),

    #[error("notebook {0} is being recorded into")]
    NotebookInUse(String),

    #[error("another analysis or chat request is still running")]
    Busy,
}

pub type AppResult<T> = Result<T, AppError>;
