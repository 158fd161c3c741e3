use scopone_core::GameError;
use thiserror::Error;

/// Everything a connection can get wrong. Reported back as an `error`
/// message; none of them end the session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error("already registered")]
    AlreadyRegistered,
    #[error("you must join first")]
    MustJoinFirst,
    #[error("no round is waiting to start")]
    NoRoundPending,
    #[error("names are locked once the game has started")]
    NamesLocked,
    #[error("malformed message: {0}")]
    Malformed(String),
}
