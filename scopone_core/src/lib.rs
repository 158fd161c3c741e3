//! # Scopone core
//!
//! Rules engine for four-player Scopone: the 40-card deck, capture
//! resolution, the round/turn state machine, end-of-round scoring, and the
//! line-delimited JSON messages exchanged between server and clients.
//! Nothing here touches the network; the server crate owns the single
//! `Game` and drives it.

mod card;
mod error;
mod logic;
mod message;
mod scoring;
mod state;

pub use card::*;

pub use error::*;

pub use logic::*;

pub use message::*;

pub use scoring::*;

pub use state::*;
