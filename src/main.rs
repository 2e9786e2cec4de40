use std::{sync::Arc, time::Duration};

use anyhow::Result;
use entitlement_gate::{
    application::usecases::{
        access_decision::{AccessDecisionUseCase, AccessSettings},
        admin::AdminUseCase,
        batch_jobs::BatchJobRunner,
        boot_epoch_gate::BootEpochGateUseCase,
        checkout::{CheckoutSettings, CheckoutUseCase},
        cryptopay_webhook::CryptoPayWebhookUseCase,
        payment_ledger::PaymentLedgerUseCase,
        reconcile_sweeper::ReconcileSweeperUseCase,
        user_sessions::UserSessionUseCase,
    },
    config::config_loader,
    domain::{
        repositories::{
            access_attempts::AccessAttemptRepository, batch::BatchMutationRepository,
            denylist::DenylistRepository,
            invoices::InvoiceRepository, notifier::Notifier,
            payment_provider::PaymentProviderClient, payments::PaymentLedgerRepository,
            service_meta::ServiceMetaRepository, users::EntitlementRepository,
        },
        value_objects::{batch_jobs::BatchMutation, boot_epoch::BootEpoch},
    },
    infrastructure::{
        axum_http::{
            self,
            http_serve::HttpUseCases,
            routers::{admin::AdminRouteState, users::UserRouteState},
        },
        cryptopay::cryptopay_client::CryptoPayClient,
        notifier::{log_notifier::LogNotifier, relay_notifier::RelayNotifier},
        postgres::{
            pg_writer::PgWriter,
            postgres_connection,
            repositories::{
                access_attempts::AccessAttemptPostgres, batch::BatchMutationPostgres,
                denylist::DenylistPostgres,
                invoices::InvoicePostgres, payments::PaymentLedgerPostgres,
                service_meta::ServiceMetaPostgres, users::EntitlementPostgres,
            },
        },
    },
    observability, services,
};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(error) = run().await {
        error!("Service exited with error: {:?}", error);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    observability::init_observability("entitlement-gate")?;

    let dotenvy_env = Arc::new(config_loader::load()?);
    info!(stage = %config_loader::get_stage(), "ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database)?;
    info!("Postgres connection has been established");

    let db_pool_arc = Arc::new(postgres_pool);
    let writer = Arc::new(PgWriter::start(
        Arc::clone(&db_pool_arc),
        dotenvy_env.database.write_queue,
    )?);

    let entitlement_repo: Arc<dyn EntitlementRepository + Send + Sync> =
        Arc::new(EntitlementPostgres::new(Arc::clone(&writer)));
    let ledger_repo: Arc<dyn PaymentLedgerRepository + Send + Sync> =
        Arc::new(PaymentLedgerPostgres::new(Arc::clone(&writer)));
    let invoice_repo: Arc<dyn InvoiceRepository + Send + Sync> =
        Arc::new(InvoicePostgres::new(Arc::clone(&writer)));
    let denylist_repo: Arc<dyn DenylistRepository + Send + Sync> =
        Arc::new(DenylistPostgres::new(Arc::clone(&writer)));
    let attempt_repo: Arc<dyn AccessAttemptRepository + Send + Sync> =
        Arc::new(AccessAttemptPostgres::new(Arc::clone(&writer)));
    let service_meta_repo: Arc<dyn ServiceMetaRepository + Send + Sync> =
        Arc::new(ServiceMetaPostgres::new(Arc::clone(&writer)));
    let batch_repo: Arc<dyn BatchMutationRepository + Send + Sync> =
        Arc::new(BatchMutationPostgres::new(Arc::clone(&db_pool_arc)));

    let notifier: Arc<dyn Notifier + Send + Sync> = match dotenvy_env.notifier.relay_url.as_deref() {
        Some(relay_url) => Arc::new(RelayNotifier::new(relay_url)?),
        None => {
            warn!("NOTIFIER_RELAY_URL is not set; notifications are only logged");
            Arc::new(LogNotifier)
        }
    };

    let cryptopay = &dotenvy_env.cryptopay;
    if !cryptopay.verify_signature {
        warn!("CRYPTOPAY_VERIFY_SIGNATURE is off; unsigned webhook bodies will be credited");
    }
    let provider: Arc<dyn PaymentProviderClient + Send + Sync> = Arc::new(CryptoPayClient::new(
        cryptopay.base_url.clone(),
        cryptopay.api_token.clone(),
        cryptopay.timeout_seconds,
    )?);

    let candidate_epoch = BootEpoch::now();
    let boot_epoch = match service_meta_repo.claim_boot_epoch(candidate_epoch).await {
        Ok(epoch) => {
            info!(epoch = %epoch, "boot epoch recorded");
            epoch
        }
        Err(err) => {
            warn!(epoch = %candidate_epoch, db_error = ?err, "failed to persist boot epoch");
            candidate_epoch
        }
    };

    let entitlements = &dotenvy_env.entitlements;
    let gate = Arc::new(BootEpochGateUseCase::new(
        Arc::clone(&entitlement_repo),
        Arc::clone(&notifier),
        boot_epoch,
    ));
    let ledger = Arc::new(PaymentLedgerUseCase::new(ledger_repo, Arc::clone(&notifier)));
    let batch_runner = Arc::new(BatchJobRunner::new(
        batch_repo,
        Arc::clone(&notifier),
        dotenvy_env.batch.chunk_size,
    ));

    if entitlements.auto_ack_on_boot {
        let summary = batch_runner
            .run(
                BatchMutation::AcknowledgeBoot {
                    epoch: boot_epoch.as_datetime(),
                },
                None,
            )
            .await?;
        info!("{}", summary.summary_line());
    }

    let sweeper = Arc::new(ReconcileSweeperUseCase::new(
        Arc::clone(&provider),
        Arc::clone(&ledger),
        dotenvy_env.reconcile.window_hours,
        dotenvy_env.reconcile.page_size,
    ));

    let usecases = HttpUseCases {
        users: UserRouteState {
            sessions: Arc::new(UserSessionUseCase::new(
                Arc::clone(&gate),
                entitlements.trial_limit,
            )),
            access: Arc::new(AccessDecisionUseCase::new(
                Arc::clone(&entitlement_repo),
                Arc::clone(&denylist_repo),
                Arc::clone(&attempt_repo),
                Arc::clone(&gate),
                AccessSettings {
                    trial_limit: entitlements.trial_limit,
                    flood_policy: entitlements.flood,
                    refund_policy: entitlements.refund_policy,
                },
            )),
            checkout: Arc::new(CheckoutUseCase::new(
                Arc::clone(&gate),
                Arc::clone(&provider),
                invoice_repo,
                CheckoutSettings {
                    asset: cryptopay.asset.clone(),
                    invoice_ttl_seconds: cryptopay.invoice_ttl_seconds,
                },
            )),
        },
        admin: AdminRouteState {
            admin: Arc::new(AdminUseCase::new(
                entitlement_repo,
                denylist_repo,
                attempt_repo,
                Arc::clone(&ledger),
                entitlements.trial_limit,
            )),
            batch_runner,
            sweeper: Arc::clone(&sweeper),
            trial_limit: entitlements.trial_limit,
        },
        webhook: Arc::new(CryptoPayWebhookUseCase::new(
            ledger,
            provider,
            cryptopay.verify_signature,
        )),
    };

    let reconcile_interval = dotenvy_env.reconcile.interval_seconds.map(Duration::from_secs);
    tokio::spawn(services::reconcile_loop::run(sweeper, reconcile_interval));

    axum_http::http_serve::start(Arc::clone(&dotenvy_env), usecases).await
}
