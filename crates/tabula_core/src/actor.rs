//! Caller identity.

use crate::UserId;
use serde::{Deserialize, Serialize};

/// Who is issuing a request.
///
/// Workspace membership has already been verified by the outer layer for
/// authenticated actors. Anonymous actors only ever reach the public path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum Actor {
    /// Authenticated user
    #[display("user:{}", _0)]
    User(UserId),
    /// Unauthenticated visitor
    #[display("anonymous")]
    Anonymous,
}

impl Actor {
    /// Whether the actor is authenticated.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Actor::User(_))
    }
}
