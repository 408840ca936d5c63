//! Automation driver connection lifecycle
//!
//! Connection attempts run detached from the request that triggered them:
//! the API answers 202 immediately and the outcome arrives via the event
//! stream and the persisted singleton record. A bounded retry budget with
//! capped exponential backoff guards against a slow-starting sidecar.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use reelscout_common::models::{ConnectionStatus, DriverConnection};
use reelscout_common::{Error, EventBus, ReelEvent, Result};

use crate::db;
use crate::services::driver::AutomationDriver;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(2);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Tracks the single automation driver connection
pub struct ConnectionManager {
    db: sqlx::SqlitePool,
    event_bus: EventBus,
    driver: Arc<dyn AutomationDriver>,
    host: String,
    port: u16,
    ready: AtomicBool,
}

impl ConnectionManager {
    pub fn new(
        db: sqlx::SqlitePool,
        event_bus: EventBus,
        driver: Arc<dyn AutomationDriver>,
        host: String,
        port: u16,
    ) -> Self {
        Self {
            db,
            event_bus,
            driver,
            host,
            port,
            ready: AtomicBool::new(false),
        }
    }

    /// True only when a connection was established and not since torn down
    /// or errored
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Current persisted connection record (disconnected if never written)
    pub async fn status(&self) -> Result<DriverConnection> {
        let record = db::connection::get_connection(&self.db).await?;
        Ok(record.unwrap_or_else(|| {
            DriverConnection::disconnected(self.host.clone(), self.port)
        }))
    }

    /// Launch a detached connection attempt. The caller gets no outcome;
    /// transitions arrive via the event stream.
    pub fn spawn_connect(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = manager.connect().await {
                warn!(error = %e, "Driver connection attempt failed");
            }
        });
    }

    /// Attempt to connect, retrying up to the attempt budget with capped
    /// exponential backoff. Every transition is persisted and broadcast.
    pub async fn connect(&self) -> Result<()> {
        self.transition(ConnectionStatus::Connecting, None).await?;

        let mut backoff = INITIAL_BACKOFF;
        let mut last_error = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            info!(attempt, host = %self.host, port = self.port, "Connecting to automation driver");

            match self.driver.connect().await {
                Ok(()) => {
                    self.ready.store(true, Ordering::Release);
                    self.transition(ConnectionStatus::Connected, None).await?;
                    info!(host = %self.host, port = self.port, "Automation driver connected");
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Driver connection attempt failed");
                    last_error = e.to_string();
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(MAX_BACKOFF);
                    }
                }
            }
        }

        self.ready.store(false, Ordering::Release);
        let message = format!(
            "Connection failed after {} attempts: {}",
            MAX_ATTEMPTS, last_error
        );
        self.transition(ConnectionStatus::Error, Some(message.clone()))
            .await?;

        Err(Error::Connection(message))
    }

    /// Tear down the connection. Idempotent; safe when already disconnected.
    pub async fn disconnect(&self) -> Result<()> {
        let was_ready = self.ready.swap(false, Ordering::AcqRel);

        if was_ready {
            // Best effort; the sidecar may already be gone
            if let Err(e) = self.driver.disconnect().await {
                warn!(error = %e, "Driver session teardown failed");
            }
        }

        self.transition(ConnectionStatus::Disconnected, None).await?;
        info!("Automation driver disconnected");
        Ok(())
    }

    /// Persist a status transition and broadcast it
    async fn transition(&self, status: ConnectionStatus, error: Option<String>) -> Result<()> {
        let previous = db::connection::get_connection(&self.db).await?;
        let now = Utc::now();

        let record = DriverConnection {
            status,
            host: self.host.clone(),
            port: self.port,
            last_connected: if status == ConnectionStatus::Connected {
                Some(now)
            } else {
                previous.and_then(|p| p.last_connected)
            },
            error_message: error.clone(),
            updated_at: now,
        };
        db::connection::save_connection(&self.db, &record).await?;

        self.event_bus.emit_lossy(ReelEvent::ConnectionStatus {
            status,
            host: self.host.clone(),
            port: self.port,
            error,
        });

        Ok(())
    }
}
