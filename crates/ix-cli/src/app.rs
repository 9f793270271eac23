//! Opening the coordinator behind a CLI invocation.

use std::sync::Arc;

use anyhow::{Context, Result};

use ix_coord::{Coordinator, Inbox};
use ix_db::{SqliteStore, WriteQueue};

use crate::Config;

/// Coordinator over the configured database, alive for one command.
pub struct App {
    pub config: Config,
    pub coordinator: Arc<Coordinator>,
    pub inbox: Inbox,
    queue: WriteQueue,
}

impl App {
    pub fn open(config: Config) -> Result<Self> {
        let store = SqliteStore::open(&config.database_path)
            .with_context(|| format!("failed to open {}", config.database_path.display()))?;
        let queue = WriteQueue::spawn(Box::new(store), config.write_policy())
            .context("failed to start write queue")?;
        let (coordinator, inbox) = Coordinator::new(queue.clone(), config.coordinator_config());
        Ok(Self {
            config,
            coordinator,
            inbox,
            queue,
        })
    }

    /// Handles pending page messages, waits for queued writes and stops the
    /// write queue.
    pub async fn close(mut self) -> Result<()> {
        self.coordinator
            .pump(&mut self.inbox)
            .await
            .context("failed to handle page messages")?;
        self.coordinator
            .drain()
            .await
            .context("failed to flush pending writes")?;
        self.queue.shutdown();
        Ok(())
    }
}
