use serde::{Deserialize, Serialize};

use crate::UserId;

/// Role of an authenticated account.
///
/// The engine treats the role as an opaque authorization input; it does not
/// implement authentication itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
    Admin,
}

impl Role {
    /// Returns the role name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An authenticated caller of an engine operation.
///
/// Supplied by the identity/session layer and passed explicitly to every
/// operation rather than read from ambient request context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    /// Creates an actor with the given role.
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    /// Creates a buyer actor.
    pub fn buyer(id: UserId) -> Self {
        Self::new(id, Role::Buyer)
    }

    /// Creates a seller actor.
    pub fn seller(id: UserId) -> Self {
        Self::new(id, Role::Seller)
    }

    /// Creates an admin actor.
    pub fn admin(id: UserId) -> Self {
        Self::new(id, Role::Admin)
    }

    /// Returns true if the actor has the admin role.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Buyer).unwrap(), "\"buyer\"");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn role_display() {
        assert_eq!(Role::Seller.to_string(), "seller");
    }

    #[test]
    fn actor_constructors() {
        let id = UserId::new();
        assert_eq!(Actor::buyer(id).role, Role::Buyer);
        assert_eq!(Actor::seller(id).role, Role::Seller);
        assert!(Actor::admin(id).is_admin());
        assert!(!Actor::buyer(id).is_admin());
    }
}
