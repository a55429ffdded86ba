//! Identity and session handling for the notes core

pub mod identity;
pub mod session;

// Re-export key types for convenience
pub use identity::{Identity, IdentityError, IdentityGateway, MemoryIdentityGateway};
pub use session::{GateDecision, Route, SessionGate};
