use thiserror::Error;

/// Errors as they are presented to a chat. The detailed cause is logged
/// by the use case that produced it.
#[derive(Error, Debug, PartialEq)]
pub enum GovBotError {
    #[error("An error occurred. Please try again later.")]
    InternalError,
    #[error("An error occurred. Please try again later.")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    BadClientData(String),
    #[error("{0}")]
    Conflict(String),
    #[error("You are not subscribed yet. Send /start to get reminders for DAO votes.")]
    NotSubscribed,
}
