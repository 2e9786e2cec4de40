use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::get,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

use crate::{
    application::usecases::cryptopay_webhook::CryptoPayWebhookUseCase,
    config::config_model::DotEnvyConfig,
    infrastructure::axum_http::{
        default_routers,
        internal_auth::{InternalToken, require_internal_token},
        routers::{self, admin::AdminRouteState, users::UserRouteState},
    },
};

pub struct HttpUseCases {
    pub users: UserRouteState,
    pub admin: AdminRouteState,
    pub webhook: Arc<CryptoPayWebhookUseCase>,
}

pub fn router(config: &DotEnvyConfig, usecases: HttpUseCases) -> Result<Router> {
    let token = InternalToken(Arc::new(config.internal_api.token.clone()));

    let internal = Router::new()
        .nest("/users", routers::users::routes(usecases.users))
        .nest("/admin", routers::admin::routes(usecases.admin))
        .layer(middleware::from_fn_with_state(token, require_internal_token));

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest("/api/v1", internal)
        .nest(
            "/cryptopay",
            routers::cryptopay_webhook::routes(usecases.webhook),
        )
        .route("/health-check", get(default_routers::health_check))
        .layer(TimeoutLayer::new(Duration::from_secs(config.server.timeout)))
        .layer(RequestBodyLimitLayer::new(
            (config.server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

pub async fn start(config: Arc<DotEnvyConfig>, usecases: HttpUseCases) -> Result<()> {
    let app = router(&config, usecases)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
