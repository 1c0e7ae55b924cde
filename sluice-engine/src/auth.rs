//! Caller capabilities.
//!
//! [`AllocationManager::new`](crate::AllocationManager::new) hands out exactly
//! one [`PoolCapability`] and one [`AdminCapability`], both bound to that
//! manager's id. They cannot be built outside this crate, so holding one is
//! proof of the role for that manager only.

use uuid::Uuid;

use crate::error::ManagerError;

/// Grants `allocate` and `withdraw_to` on one manager.
#[derive(Debug, PartialEq, Eq)]
pub struct PoolCapability {
    manager_id: Uuid,
}

/// Grants registry changes and parameter updates on one manager.
#[derive(Debug, PartialEq, Eq)]
pub struct AdminCapability {
    manager_id: Uuid,
}

impl PoolCapability {
    /// Id of the manager this capability belongs to.
    #[must_use]
    pub const fn manager_id(&self) -> Uuid {
        self.manager_id
    }
}

impl AdminCapability {
    /// Id of the manager this capability belongs to.
    #[must_use]
    pub const fn manager_id(&self) -> Uuid {
        self.manager_id
    }
}

pub(crate) trait Capability {
    fn bound_to(&self) -> Uuid;
}

impl Capability for PoolCapability {
    fn bound_to(&self) -> Uuid {
        self.manager_id
    }
}

impl Capability for AdminCapability {
    fn bound_to(&self) -> Uuid {
        self.manager_id
    }
}

pub(crate) fn issue(manager_id: Uuid) -> (PoolCapability, AdminCapability) {
    (PoolCapability { manager_id }, AdminCapability { manager_id })
}

pub(crate) fn authorize(capability: &impl Capability, manager_id: Uuid) -> Result<(), ManagerError> {
    if capability.bound_to() == manager_id {
        Ok(())
    } else {
        Err(ManagerError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_capabilities_share_manager_id() {
        let id = Uuid::new_v4();
        let (pool, admin) = issue(id);
        assert_eq!(pool.manager_id(), id);
        assert_eq!(admin.manager_id(), id);
        assert!(authorize(&pool, id).is_ok());
        assert!(authorize(&admin, id).is_ok());
    }

    #[test]
    fn test_foreign_capability_rejected() {
        let (pool, admin) = issue(Uuid::new_v4());
        let other = Uuid::new_v4();
        assert_eq!(authorize(&pool, other), Err(ManagerError::Unauthorized));
        assert_eq!(authorize(&admin, other), Err(ManagerError::Unauthorized));
    }
}
