use crate::{api, FetchRequest, TempId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Loading or searching failed; the view is back to what it showed before and the same
    /// request can be re-issued with `ThreadController::retry`
    #[error("failed fetching comments sorted by {}", .request.sort)]
    Fetch {
        request: FetchRequest,
        #[source]
        source: api::Error,
    },

    #[error("no pending change with id {0:?}")]
    UnknownPending(TempId),

    #[error(transparent)]
    Api(#[from] api::Error),
}

impl Error {
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Fetch { source, .. } => source.is_retryable(),
            Error::UnknownPending(_) => false,
            Error::Api(e) => e.is_retryable(),
        }
    }
}
