use thiserror::Error;

use crate::{application::embed::EmbedError, config::LoadError, infra::error::InfraError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Embed(#[from] EmbedError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

impl From<crate::application::embed::EmbedConfigError> for AppError {
    fn from(error: crate::application::embed::EmbedConfigError) -> Self {
        Self::Embed(error.into())
    }
}
