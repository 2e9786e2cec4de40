use crate::domain::entities::users::UserEntitlementEntity;

/// Result of crediting one payload. A duplicate delivery is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOutcome {
    Applied { user: UserEntitlementEntity },
    AlreadyApplied,
}

impl LedgerOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, LedgerOutcome::Applied { .. })
    }
}

/// A single-row mutation's resulting record and whether anything changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub user: UserEntitlementEntity,
    pub changed: bool,
}
