use thiserror::Error;

use spapi_client::ClientError;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("The API did not return a {0} document id")]
    MissingDocumentId(&'static str),
}

impl WorkflowError {
    /// The underlying client error, if any.
    pub const fn client_error(&self) -> Option<&ClientError> {
        match self {
            Self::Client(error) => Some(error),
            Self::MissingDocumentId(_) => None,
        }
    }
}
