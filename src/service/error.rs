use crate::repository::error::DatabaseError;
use crate::subscription::RegistryError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error("Please specify the subscription query you wish to add.")]
    BlankQuery,

    #[error("A subscription for \"{query}\" already exists in this chat.")]
    DuplicateSubscription { query: String, destination: u64 },

    #[error("There is not a subscription for \"{query}\" in this chat.")]
    NotFound { query: String, destination: u64 },

    #[error("DatabaseError: {0}")]
    DatabaseError(#[from] DatabaseError),
}

impl From<RegistryError> for ServiceError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateSubscription { query, destination } => {
                ServiceError::DuplicateSubscription { query, destination }
            }
            RegistryError::NotFound { query, destination } => {
                ServiceError::NotFound { query, destination }
            }
        }
    }
}
