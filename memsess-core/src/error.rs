use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to generate session id: {0}")]
    IdGeneration(String),
}
