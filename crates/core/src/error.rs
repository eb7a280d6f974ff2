#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid text: {0}")]
    Text(#[from] portal_types::TextError),
    #[error("not found: {0}")]
    NotFound(String),
}

pub type PortalResult<T> = std::result::Result<T, PortalError>;
