use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::entitlement_errors::{EntitlementError, UseCaseResult};
use crate::domain::{
    entities::users::UserEntitlementEntity,
    repositories::{notifier::Notifier, users::EntitlementRepository},
    value_objects::{boot_epoch::BootEpoch, entitlement_mutations::EntitlementMutation},
};

/// Refuses user mutations until the user has acknowledged the current process start.
pub struct BootEpochGateUseCase {
    entitlement_repo: Arc<dyn EntitlementRepository + Send + Sync>,
    notifier: Arc<dyn Notifier + Send + Sync>,
    epoch: BootEpoch,
}

impl BootEpochGateUseCase {
    pub fn new(
        entitlement_repo: Arc<dyn EntitlementRepository + Send + Sync>,
        notifier: Arc<dyn Notifier + Send + Sync>,
        epoch: BootEpoch,
    ) -> Self {
        Self {
            entitlement_repo,
            notifier,
            epoch,
        }
    }

    pub fn epoch(&self) -> BootEpoch {
        self.epoch
    }

    pub async fn needs_reactivation(&self, user_id: i64, now: DateTime<Utc>) -> UseCaseResult<bool> {
        let user = self.load(user_id, now).await?;
        Ok(!self.epoch.is_acknowledged(user.boot_acknowledged_at))
    }

    /// Returns the record when the user is acknowledged; otherwise asks the front-end for a
    /// handshake and refuses.
    pub async fn ensure_active(&self, user_id: i64, now: DateTime<Utc>) -> UseCaseResult<UserEntitlementEntity> {
        let user = self.load(user_id, now).await?;
        if self.epoch.is_acknowledged(user.boot_acknowledged_at) {
            return Ok(user);
        }

        info!(%user_id, epoch = %self.epoch, "boot_gate: stale acknowledgement, refusing");
        self.request_reactivation(user_id).await;
        Err(EntitlementError::ReactivationRequired)
    }

    /// Fresh handshake: stamps the user with the current epoch.
    pub async fn acknowledge(&self, user_id: i64, now: DateTime<Utc>) -> UseCaseResult<UserEntitlementEntity> {
        let outcome = self
            .entitlement_repo
            .mutate(
                user_id,
                EntitlementMutation::AcknowledgeBoot {
                    epoch: self.epoch.as_datetime(),
                },
                now,
            )
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "boot_gate: failed to acknowledge");
                EntitlementError::Internal(err)
            })?;

        if outcome.changed {
            info!(%user_id, epoch = %self.epoch, "boot_gate: user acknowledged");
        }
        Ok(outcome.user)
    }

    pub async fn request_reactivation(&self, user_id: i64) {
        if let Err(err) = self.notifier.request_reactivation(user_id).await {
            warn!(%user_id, error = ?err, "boot_gate: reactivation request not delivered");
        }
    }

    async fn load(&self, user_id: i64, now: DateTime<Utc>) -> UseCaseResult<UserEntitlementEntity> {
        self.entitlement_repo
            .find_or_create(user_id, now)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "boot_gate: failed to load user");
                EntitlementError::Internal(err)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::usecases::testing::{InMemoryStore, RecordingNotifier};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[tokio::test]
    async fn user_acknowledged_before_restart_must_handshake_once() {
        let mut user = UserEntitlementEntity::new_default(42, now() - Duration::days(2));
        user.boot_acknowledged_at = now() - Duration::days(1);
        let store = Arc::new(InMemoryStore::with_users(vec![user]));
        let notifier = Arc::new(RecordingNotifier::default());
        let gate = BootEpochGateUseCase::new(store.clone(), notifier.clone(), BootEpoch::new(now()));

        assert!(gate.needs_reactivation(42, now()).await.unwrap());
        assert!(matches!(
            gate.ensure_active(42, now()).await,
            Err(EntitlementError::ReactivationRequired)
        ));
        assert_eq!(*notifier.reactivations.lock().unwrap(), vec![42]);

        let user = gate.acknowledge(42, now() + Duration::seconds(3)).await.unwrap();
        assert_eq!(user.boot_acknowledged_at, now());
        assert!(!gate.needs_reactivation(42, now()).await.unwrap());
        assert!(gate.ensure_active(42, now()).await.is_ok());
        assert_eq!(notifier.reactivations.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn new_user_starts_unacknowledged() {
        let store = Arc::new(InMemoryStore::default());
        let gate = BootEpochGateUseCase::new(
            store.clone(),
            Arc::new(RecordingNotifier::failing()),
            BootEpoch::new(now()),
        );

        assert!(gate.needs_reactivation(7, now()).await.unwrap());
        assert!(gate.ensure_active(7, now()).await.is_err());
        assert!(store.user(7).is_some());
    }

    #[tokio::test]
    async fn storage_failure_surfaces_as_internal() {
        let mut repo = crate::domain::repositories::users::MockEntitlementRepository::new();
        repo.expect_find_or_create()
            .returning(|_, _| Err(anyhow::anyhow!("connection refused")));
        let gate = BootEpochGateUseCase::new(
            Arc::new(repo),
            Arc::new(RecordingNotifier::default()),
            BootEpoch::new(now()),
        );

        let err = gate.ensure_active(1, now()).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
