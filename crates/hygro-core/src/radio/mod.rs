pub mod at;
pub mod link;

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// Neither the awaited token nor any other answer arrived before the deadline.
    #[error("radio unresponsive (waiting for {waiting_for})")]
    Unresponsive { waiting_for: &'static str },
    /// The radio answered with a failure token.
    #[error("radio rejected the command with {token}")]
    Rejected { token: &'static str },
    #[error("{what} does not fit its buffer")]
    Format { what: &'static str },
}

pub use at::{AckMatcher, AckState, AtDriver};
pub use link::RadioLink;
