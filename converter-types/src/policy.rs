//! Ownership-based authorization.
//!
//! Two gates: an identity must be present at all, and instance-level
//! operations require that identity to own the instance. Delete also admits
//! superusers.

use crate::domain::{User, UserId};
use crate::error::{AppError, messages};

/// What the caller is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Retrieve,
    Update,
    Convert,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No identity was presented. Maps to 401.
    Unauthenticated,
    /// Identity is known but does not own the resource. Maps to 403.
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::Unauthenticated) => {
                Err(AppError::Unauthenticated(messages::NOT_AUTHENTICATED.into()))
            }
            Decision::Deny(DenyReason::Forbidden) => {
                Err(AppError::Forbidden(messages::FORBIDDEN.into()))
            }
        }
    }
}

/// Decides whether `identity` may perform `op`.
///
/// `owner` is `None` for operations not aimed at a specific instance
/// (creating, converting by code), in which case authentication suffices.
pub fn authorize(identity: Option<&User>, op: Operation, owner: Option<UserId>) -> Decision {
    let Some(user) = identity else {
        return Decision::Deny(DenyReason::Unauthenticated);
    };

    let Some(owner) = owner else {
        return Decision::Allow;
    };

    let allowed = match op {
        Operation::Create | Operation::Retrieve | Operation::Update | Operation::Convert => {
            user.id == owner
        }
        Operation::Delete => user.id == owner || user.is_superuser,
    };

    if allowed {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::Forbidden)
    }
}

/// Owner to store on a create or refresh: the acting user, unless they are
/// staff, in which case the declared owner is kept.
pub fn assign_owner(acting: &User, declared: UserId) -> UserId {
    if acting.is_staff { declared } else { acting.id }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(is_staff: bool, is_superuser: bool) -> User {
        User {
            is_staff,
            is_superuser,
            ..User::new("someone@example.com", false, false).unwrap()
        }
    }

    #[test]
    fn test_no_identity_is_unauthenticated() {
        for op in [
            Operation::Create,
            Operation::Retrieve,
            Operation::Update,
            Operation::Convert,
            Operation::Delete,
        ] {
            assert_eq!(
                authorize(None, op, Some(UserId::new())),
                Decision::Deny(DenyReason::Unauthenticated)
            );
            assert_eq!(
                authorize(None, op, None),
                Decision::Deny(DenyReason::Unauthenticated)
            );
        }
    }

    #[test]
    fn test_owner_is_allowed() {
        let owner = user(false, false);
        for op in [Operation::Retrieve, Operation::Update, Operation::Convert, Operation::Delete] {
            assert!(authorize(Some(&owner), op, Some(owner.id)).is_allowed());
        }
    }

    #[test]
    fn test_non_owner_is_forbidden() {
        let other = user(true, false);
        for op in [Operation::Retrieve, Operation::Update, Operation::Convert, Operation::Delete] {
            assert_eq!(
                authorize(Some(&other), op, Some(UserId::new())),
                Decision::Deny(DenyReason::Forbidden)
            );
        }
    }

    #[test]
    fn test_superuser_bypasses_only_delete() {
        let admin = user(true, true);
        let owner = UserId::new();

        assert!(authorize(Some(&admin), Operation::Delete, Some(owner)).is_allowed());
        assert!(!authorize(Some(&admin), Operation::Retrieve, Some(owner)).is_allowed());
        assert!(!authorize(Some(&admin), Operation::Update, Some(owner)).is_allowed());
    }

    #[test]
    fn test_collection_operations_need_only_identity() {
        let anyone = user(false, false);
        assert!(authorize(Some(&anyone), Operation::Create, None).is_allowed());
        assert!(authorize(Some(&anyone), Operation::Convert, None).is_allowed());
    }

    #[test]
    fn test_decision_maps_to_status_errors() {
        assert!(matches!(
            Decision::Deny(DenyReason::Unauthenticated).into_result(),
            Err(AppError::Unauthenticated(_))
        ));
        assert!(matches!(
            Decision::Deny(DenyReason::Forbidden).into_result(),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_assign_owner() {
        let regular = user(false, false);
        let staff = user(true, false);
        let declared = UserId::new();

        assert_eq!(assign_owner(&regular, declared), regular.id);
        assert_eq!(assign_owner(&staff, declared), declared);
    }
}
