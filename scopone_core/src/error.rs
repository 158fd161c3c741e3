use thiserror::Error;

/// Rule violations reported by the game engine.
///
/// All of them are recoverable: the offending move is rejected and the game
/// is left as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("invalid card index")]
    InvalidCardIndex,
    #[error("an ace cannot be the first card of the game")]
    AceAsFirstMoveForbidden,
    #[error("unknown player")]
    UnknownPlayer,
    #[error("invalid name (must be 1 to {max} characters)", max = crate::MAX_NAME_LEN)]
    InvalidName,
    #[error("name already taken")]
    NameAlreadyTaken,
    #[error("no round in progress")]
    RoundNotInProgress,
    #[error("card value {0} is outside 1..=10")]
    InvalidCardValue(u8),
}
