//! Service lifecycle: owns the hub, the watcher and the dispatcher task.
//!
//! # Shutdown order
//!
//! 1. Stop the watcher. No new events are produced after this.
//! 2. Drop the event sink and wait, bounded by the shutdown timeout, for
//!    the dispatcher to broadcast what is already queued. A dispatcher that
//!    does not finish in time is aborted.
//! 3. Close every viewer connection.
//! 4. Cancel the HTTP server.

use fc_core::Config;
use fc_hub::{BroadcastHub, EventSink};
use fc_watcher::{IgnoreRules, WatchError, WatchedRoots, Watcher};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::router::router;
use crate::state::{AppState, ConnectionSettings, StatusReport};

type FileWatcher = Watcher<IgnoreRules, EventSink>;

/// A running filecast instance.
///
/// # Examples
///
/// ```no_run
/// use fc_core::Config;
/// use fc_server::Service;
///
/// # async fn example() -> Result<(), fc_server::ServiceError> {
/// let service = Service::start(Config::default()).await?;
/// let listener = service.bind().await?;
/// let server = service.serve(listener);
///
/// tokio::signal::ctrl_c().await.ok();
/// service.shutdown().await;
/// let _ = server.await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Service {
    config: Config,
    hub: BroadcastHub,
    watcher: Mutex<FileWatcher>,
    roots: WatchedRoots,
    dispatcher: JoinHandle<u64>,
    shutdown: CancellationToken,
}

impl Service {
    /// Validates `config`, builds the hub and dispatcher, and starts the
    /// watcher.
    ///
    /// A watcher that cannot start is fatal only when `watch.required` is
    /// set; otherwise the failure is logged and the service runs without
    /// live updates.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] for an invalid configuration and
    /// [`ServiceError::Watch`] when a required watcher fails to start.
    pub async fn start(config: Config) -> Result<Self, ServiceError> {
        config.validate()?;

        let hub = BroadcastHub::new(config.hub);
        let (sink, dispatcher) = hub.channel(config.watch.channel_capacity);
        let dispatcher = tokio::spawn(dispatcher.run());

        let filter = IgnoreRules::default().with_patterns(&config.watch.ignore);
        let mut watcher = Watcher::new(filter, sink);
        let roots = watcher.roots_handle();

        if let Err(e) = start_watcher(&mut watcher, &config).await {
            if config.watch.required {
                return Err(e.into());
            }
            tracing::error!(error = %e, "File watcher unavailable, serving without live updates");
        }

        Ok(Self {
            config,
            hub,
            watcher: Mutex::new(watcher),
            roots,
            dispatcher,
            shutdown: CancellationToken::new(),
        })
    }

    /// Binds the configured listen address.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Bind`] if the address is unavailable.
    pub async fn bind(&self) -> Result<TcpListener, ServiceError> {
        let address = self.config.server.bind_address();
        TcpListener::bind(&address)
            .await
            .map_err(|source| ServiceError::Bind { address, source })
    }

    /// Returns the router state for this service.
    #[must_use]
    pub fn state(&self) -> AppState {
        AppState {
            hub: self.hub.clone(),
            roots: self.roots.clone(),
            settings: ConnectionSettings::from(&self.config.server),
            shutdown: self.shutdown.clone(),
        }
    }

    /// Builds the HTTP router for this service.
    #[must_use]
    pub fn router(&self) -> axum::Router {
        router(self.state(), self.config.server.static_dir.as_deref())
    }

    /// Serves HTTP and WebSocket traffic on `listener` until
    /// [`shutdown`](Self::shutdown) runs.
    pub fn serve(&self, listener: TcpListener) -> JoinHandle<Result<(), ServiceError>> {
        let app = self.router();
        let token = self.shutdown.clone();

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(addr = %addr, "Listening");
        }

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
                .map_err(ServiceError::Serve)
        })
    }

    /// Stops the watcher and starts it again on the configured roots.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Watch`] if the watcher cannot be restarted.
    /// The service keeps serving either way.
    pub async fn restart_watcher(&self) -> Result<(), ServiceError> {
        let mut watcher = self.watcher.lock().await;
        watcher.stop().await;
        start_watcher(&mut watcher, &self.config).await?;
        Ok(())
    }

    /// Returns the current status report.
    #[must_use]
    pub fn status(&self) -> StatusReport {
        self.state().status()
    }

    /// Returns the hub.
    #[must_use]
    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Returns the configuration the service was started with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shuts the service down.
    pub async fn shutdown(self) {
        tracing::info!("Shutting down");

        let mut watcher = self.watcher.into_inner();
        watcher.stop().await;
        drop(watcher);

        let drain = self.config.server.shutdown_timeout();
        let mut dispatcher = self.dispatcher;
        match tokio::time::timeout(drain, &mut dispatcher).await {
            Ok(Ok(events)) => tracing::debug!(events, "Dispatcher drained"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Dispatcher task failed"),
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.server.shutdown_timeout_ms,
                    "Dispatcher did not drain in time"
                );
                dispatcher.abort();
            }
        }

        self.hub.close_all().await;
        self.shutdown.cancel();
    }
}

async fn start_watcher(watcher: &mut FileWatcher, config: &Config) -> Result<(), WatchError> {
    if config.watch.roots.is_empty() {
        tracing::warn!("No watch roots configured");
        return Err(WatchError::NoWatchableRoots { requested: 0 });
    }
    watcher.start(&config.watch.roots).await
}
