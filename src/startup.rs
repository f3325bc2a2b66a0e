//! Application Startup
//!
//! Application building, worker spawning, and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::services::TokenAuthority;
use crate::config::Settings;
use crate::domain::services::{Authorizer, RoleAuthorizer};
use crate::infrastructure::database::{self, Store};
use crate::infrastructure::messaging::{KafkaPublisher, KafkaSubscriber};
use crate::infrastructure::repositories::{
    PgBookingRepository, PgCoworkingRepository, PgOutboxRepository, PgPlaceRepository,
};
use crate::infrastructure::workers::{OutboxDispatcher, SchedulerConsumer};
use crate::presentation::http::routes;
use crate::presentation::middleware::{create_cors_layer, create_trace_layer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub store: Store,
    pub token_authority: Arc<TokenAuthority>,
    pub authorizer: Arc<dyn Authorizer>,
    pub settings: Arc<Settings>,
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    /// Build the application from settings. Missing key material, an
    /// unreachable database, or a taken port are fatal.
    pub async fn build(settings: Settings) -> Result<Self> {
        let db = database::create_pool(&settings.postgres)
            .await
            .context("opening database pool")?;
        tracing::info!("Database connection pool created");

        if let Err(err) = database::run_migrations(&db).await {
            tracing::error!(error = %err, "migrations failed");
        }

        let token_authority = Arc::new(
            TokenAuthority::from_settings(&settings.auth, settings.app.name.clone())
                .context("loading signing keys")?,
        );

        let state = AppState {
            db: db.clone(),
            store: Store::new(db),
            token_authority,
            authorizer: Arc::new(RoleAuthorizer),
            settings: Arc::new(settings.clone()),
        };

        let router = routes::create_router(state.clone())
            .layer(create_trace_layer())
            .layer(create_cors_layer());

        let addr: SocketAddr = settings
            .server_addr()
            .parse()
            .context("invalid http host/port")?;
        let listener = TcpListener::bind(addr)
            .await
            .context("binding http port")?;
        tracing::info!("Listening on {}", addr);

        Ok(Self {
            listener,
            router,
            state,
        })
    }

    /// Spawn the outbox dispatcher and scheduler consumer on the given
    /// cancellation scope.
    pub fn spawn_workers(&self, cancel: CancellationToken) -> Result<Vec<JoinHandle<()>>> {
        let settings = &self.state.settings;
        let db = self.state.db.clone();
        let store = self.state.store.clone();

        // Outbox dispatcher
        let publisher =
            Arc::new(KafkaPublisher::new(&settings.kafka).context("building kafka producer")?);
        let dispatcher = OutboxDispatcher::new(
            Arc::new(PgOutboxRepository::new(db.clone())),
            publisher,
            store.clone(),
            &settings.outbox,
        );
        let dispatcher_cancel = cancel.clone();
        let dispatcher_handle = tokio::spawn(async move {
            dispatcher.run(dispatcher_cancel).await;
        });

        // Scheduler consumer
        let subscriber = KafkaSubscriber::new(&settings.kafka, &settings.kafka.consumer.group_id)
            .context("building kafka consumer")?;
        let booking_service = crate::application::services::BookingService::new(
            Arc::new(PgBookingRepository::new(db.clone())),
            Arc::new(PgPlaceRepository::new(db.clone())),
            Arc::new(PgCoworkingRepository::new(db.clone())),
            Arc::new(PgOutboxRepository::new(db)),
            store,
        );
        let consumer = SchedulerConsumer::new(
            Arc::new(booking_service),
            subscriber,
            settings.kafka.topics.scheduler_events.clone(),
        );
        let consumer_cancel = cancel;
        let consumer_handle = tokio::spawn(async move {
            if let Err(err) = consumer.run(consumer_cancel).await {
                tracing::error!(error = %err, "scheduler consumer terminated");
            }
        });

        Ok(vec![dispatcher_handle, consumer_handle])
    }

    /// Run the server until the cancellation token fires, then drain
    /// in-flight requests.
    pub async fn run_until_stopped(self, cancel: CancellationToken) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}
