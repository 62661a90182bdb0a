/// Errors that can occur during catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Remote service error: {message}")]
    Remote { message: String },
    #[error("Preference store error: {message}")]
    Store { message: String },
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl CatalogError {
    pub fn remote(err: impl std::fmt::Display) -> Self {
        Self::Remote {
            message: err.to_string(),
        }
    }

    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::Store {
            message: err.to_string(),
        }
    }
}
