use crate::clock::SystemClock;
use crate::commands::Dispatcher;
use crate::config::Config;
use crate::db::connection::DbPool;
use crate::polls::PollEngine;
use crate::sse::{EventSender, create_event_broadcaster};
use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing::{debug, error};

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub engine: PollEngine,
    pub dispatcher: Dispatcher,
    pub events: EventSender,
}

impl AppState {
    pub fn new(db: DbPool, config: &Config) -> Self {
        let clock = Arc::new(SystemClock::with_offset(config.utc_offset_secs));
        let engine = PollEngine::new(db.clone(), clock);
        let events = create_event_broadcaster();
        let dispatcher = Dispatcher::new(
            engine.clone(),
            events.clone(),
            config.command_prefix.clone(),
            config.store_timeout,
        );

        AppState {
            db,
            engine,
            dispatcher,
            events,
        }
    }

    /// Pings the pool once a minute so a broken store shows up in the logs
    /// before the next command hits it.
    pub fn spawn_health_check(&self) {
        let db = self.db.clone();
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                match db.acquire().await {
                    Ok(conn) => {
                        drop(conn);
                        debug!("{}", crate::db::get_pool_stats(&db).await);
                    }
                    Err(e) => {
                        error!("Database connection health check failed: {}", e);
                    }
                }
            }
        });
    }
}
