use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{boot_epoch_gate::BootEpochGateUseCase, entitlement_errors::UseCaseResult};
use crate::domain::value_objects::entitlements::EntitlementStatusDto;

pub struct UserSessionUseCase {
    gate: Arc<BootEpochGateUseCase>,
    trial_limit: i32,
}

impl UserSessionUseCase {
    pub fn new(gate: Arc<BootEpochGateUseCase>, trial_limit: i32) -> Self {
        Self { gate, trial_limit }
    }

    /// `/start`: the handshake that clears the boot gate.
    pub async fn start(&self, user_id: i64, now: DateTime<Utc>) -> UseCaseResult<EntitlementStatusDto> {
        let user = self.gate.acknowledge(user_id, now).await?;
        Ok(EntitlementStatusDto::from_entity(&user, self.trial_limit, now))
    }

    pub async fn status(&self, user_id: i64, now: DateTime<Utc>) -> UseCaseResult<EntitlementStatusDto> {
        let user = self.gate.ensure_active(user_id, now).await?;
        Ok(EntitlementStatusDto::from_entity(&user, self.trial_limit, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::usecases::{
            entitlement_errors::EntitlementError,
            testing::{InMemoryStore, RecordingNotifier},
        },
        domain::value_objects::boot_epoch::BootEpoch,
    };
    use chrono::TimeZone;

    #[tokio::test]
    async fn status_requires_start_first() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let store = Arc::new(InMemoryStore::default());
        let gate = Arc::new(BootEpochGateUseCase::new(
            store,
            Arc::new(RecordingNotifier::default()),
            BootEpoch::new(now),
        ));
        let sessions = UserSessionUseCase::new(gate, 3);

        assert!(matches!(
            sessions.status(9, now).await,
            Err(EntitlementError::ReactivationRequired)
        ));

        let started = sessions.start(9, now).await.unwrap();
        assert_eq!(started.trial_remaining, 3);
        assert_eq!(sessions.status(9, now).await.unwrap(), started);
    }
}
