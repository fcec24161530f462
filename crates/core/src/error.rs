use crate::backend::ToolError;
use crate::stages::Stage;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("missing input {role}: {} does not resolve to an existing file", .path.display())]
    MissingInput {
        role: &'static str,
        path: PathBuf,
    },
    #[error("failed to create working directory {}: {source}", .path.display())]
    WorkingDirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create output directory {}: {source}", .path.display())]
    OutputDirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to append to run log: {0}")]
    RunLogWrite(std::io::Error),
    #[error("failed to write QA script: {0}")]
    QaScriptWrite(std::io::Error),
    #[error("stage '{stage}' failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: ToolError,
    },
}

impl PipelineError {
    /// Process exit status for this failure.
    ///
    /// A tool that exited with its own status hands that status through;
    /// everything else maps to 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Stage {
                source: ToolError::Failed { code: Some(code), .. },
                ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
