use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tokio::sync::watch;
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

use account_manager::api::{self, ApiStore, Context};
use account_manager::config::Config;
use account_manager::db::Store;
use account_manager::models;
use account_manager::provisioner::{ExecProvisioner, SubnetPool};
use account_manager::supervisor::{AccountStore, AccountSupervisor, Doer, MultiDoer, Scheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::default();
    let instance_id = models::new_id();
    info!(instance = %instance_id, environment = %config.environment, "starting account-manager");

    let store = Store::connect(&config.database)
        .await
        .context("connecting to database")?;

    info!("running database migrations");
    sqlx::migrate!("./migrations")
        .run(store.pool())
        .await
        .context("running migrations")?;
    store
        .check_schema_version()
        .await
        .context("checking schema version")?;

    let store = Arc::new(store);

    let mut doers = MultiDoer::default();
    if config.supervisor.enabled {
        match ExecProvisioner::from_config(
            &config.provisioner,
            store.clone() as Arc<dyn SubnetPool>,
        ) {
            Some(provisioner) => {
                doers.push(Arc::new(AccountSupervisor::new(
                    store.clone() as Arc<dyn AccountStore>,
                    Arc::new(provisioner),
                    instance_id.as_str(),
                    config.environment.as_str(),
                )));
            }
            None => warn!(
                "no provisioner command configured; running API-only, accounts will stay pending"
            ),
        }
    } else {
        warn!("account supervisor disabled; only API functionality will work");
    }

    let poll = Duration::from_secs(config.supervisor.poll_interval_secs);
    if poll.is_zero() {
        info!("periodic scheduling disabled; only pokes drive background work");
    }
    let scheduler = Arc::new(Scheduler::new(Arc::new(doers), poll));

    let context = Context::new(
        store.clone() as Arc<dyn ApiStore>,
        scheduler.clone() as Arc<dyn Doer>,
        config.environment.as_str(),
    );
    let app = api::router(Arc::new(context)).layer(TimeoutLayer::new(Duration::from_secs(
        config.server.request_timeout_secs,
    )));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("parsing listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("binding listener")?;
    info!(%addr, "listening");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let mut drain_rx = shutdown_rx.clone();
    let mut grace_rx = shutdown_rx;
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = drain_rx.changed().await;
            info!("shutdown signal received; draining in-flight requests");
        })
        .into_future();

    let grace = Duration::from_secs(config.server.shutdown_grace_secs);
    tokio::select! {
        result = server => result.context("serving HTTP")?,
        _ = async {
            let _ = grace_rx.changed().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(grace_secs = grace.as_secs(), "drain timed out; abandoning in-flight requests");
        }
    }

    scheduler.close().await;
    info!("shutdown complete");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(_) => ctrl_c.await,
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await;
}
