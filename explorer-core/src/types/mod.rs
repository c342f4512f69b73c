//! Explorer data model

pub mod ownership;
pub mod peer_set;
pub mod token;

pub use ownership::{
    OwnershipRecord, OwnershipTransition, PinnerReport, TransactionRecord, TransitionKind,
};
pub use peer_set::PeerSet;
pub use token::{MintPosition, Token, TokenId};
