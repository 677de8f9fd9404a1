use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine has been shut down")]
    Stopped,
}
