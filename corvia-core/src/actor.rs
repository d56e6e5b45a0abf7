use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Admin,
}

/// The authenticated identity behind an operation. Token verification is the
/// HTTP layer's job; by the time an `Actor` exists it is trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn customer(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::Customer,
        }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owners and administrators may manage a booking
    pub fn can_manage(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_and_admin_can_manage() {
        let owner = Uuid::new_v4();
        assert!(Actor::customer(owner).can_manage(owner));
        assert!(Actor::admin(Uuid::new_v4()).can_manage(owner));
        assert!(!Actor::customer(Uuid::new_v4()).can_manage(owner));
    }
}
