use recon_data::DataError;
use recon_engine::EngineError;
use recon_pipeline::PipelineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl AppError {
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Pipeline(err) => err.exit_code(),
            _ => 1,
        }
    }
}
