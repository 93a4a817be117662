pub type RunesResult<T> = Result<T, RunesError>;

#[derive(thiserror::Error, Debug)]
pub enum RunesError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("iteration error: worker '{worker}' failed at step {step}: {message}")]
    Iteration {
        worker: String,
        step: u32,
        message: String,
    },

    #[error("evaluation error: {0}")]
    Evaluation(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RunesError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn iteration(worker: impl Into<String>, step: u32, msg: impl Into<String>) -> Self {
        Self::Iteration {
            worker: worker.into(),
            step,
            message: msg.into(),
        }
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for RunesError {
    fn from(err: serde_json::Error) -> Self {
        Self::serde(err.to_string())
    }
}
