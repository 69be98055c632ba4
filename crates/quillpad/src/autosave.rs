//! Debounced background work for a session: stats, selection stats and
//! saving. Each channel holds at most one pending timer; arming it again
//! aborts the previous one.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::config::AutosaveConfig;
use crate::error::StorageError;
use crate::metrics::{selection_stats, SelectionStats, StatsSnapshot};
use crate::storage::{DocumentRecord, DocumentStore, SaveRequest};

/// One cancellable, re-armable timer.
pub struct DebounceChannel {
    name: &'static str,
    pending: Option<JoinHandle<()>>,
}

impl DebounceChannel {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            pending: None,
        }
    }

    /// Run `action` after `delay` unless the channel is armed again first.
    /// Once the timer fires the action runs as its own task, so re-arming
    /// or cancelling never interrupts an action that already started.
    pub fn arm<F>(&mut self, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        // only spawn inside a runtime so plain unit tests can drive sessions
        if tokio::runtime::Handle::try_current().is_err() {
            log::debug!("No runtime, dropping {} timer", self.name);
            return;
        }
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(action);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for DebounceChannel {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// The document as it was when a save was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSnapshot {
    pub title: String,
    pub content: String,
    pub font_family: String,
    /// Session edit counter at capture time
    pub version: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SaveStatus {
    #[default]
    Idle,
    /// A save timer is armed
    Pending,
    Saving,
    Saved,
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveState {
    pub status: SaveStatus,
    pub id: Option<String>,
    /// `lastModified` of the newest successful save
    pub last_saved: Option<i64>,
    /// Edit counter of the newest successful save
    pub saved_version: u64,
    /// Finished save attempts, successful or not
    pub completed: u64,
}

/// Serializes the saves of one session. The mutex holds the document id, so
/// a save that starts while the first save of a new document is still in
/// flight waits for the id instead of creating a second record.
struct Persister {
    store: Arc<dyn DocumentStore>,
    id: Mutex<Option<String>>,
    state: Arc<watch::Sender<SaveState>>,
}

impl Persister {
    async fn persist(&self, snapshot: SaveSnapshot) -> Result<DocumentRecord, StorageError> {
        let mut id = self.id.lock().await;
        self.state.send_modify(|state| state.status = SaveStatus::Saving);

        let request = SaveRequest {
            id: id.clone(),
            title: snapshot.title,
            content: snapshot.content,
            font_family: snapshot.font_family,
        };
        match self.store.save(request).await {
            Ok(record) => {
                *id = Some(record.id.clone());
                self.state.send_modify(|state| {
                    state.status = SaveStatus::Saved;
                    state.id = Some(record.id.clone());
                    state.last_saved = Some(record.last_modified);
                    state.saved_version = state.saved_version.max(snapshot.version);
                    state.completed += 1;
                });
                log::info!("Document '{}' saved", record.id);
                Ok(record)
            }
            Err(e) => {
                log::error!("Failed to save document: {}", e);
                self.state.send_modify(|state| {
                    state.status = SaveStatus::Failed(e.to_string());
                    state.completed += 1;
                });
                Err(e)
            }
        }
    }
}

pub struct AutosaveCoordinator {
    config: AutosaveConfig,
    metrics: DebounceChannel,
    save: DebounceChannel,
    selection: DebounceChannel,
    stats_tx: Arc<watch::Sender<StatsSnapshot>>,
    selection_tx: Arc<watch::Sender<Option<SelectionStats>>>,
    save_tx: Arc<watch::Sender<SaveState>>,
    persister: Arc<Persister>,
}

impl AutosaveCoordinator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        config: AutosaveConfig,
        id: Option<String>,
        last_saved: Option<i64>,
    ) -> Self {
        let (stats_tx, _) = watch::channel(StatsSnapshot::default());
        let (selection_tx, _) = watch::channel(None);
        let (save_tx, _) = watch::channel(SaveState {
            id: id.clone(),
            last_saved,
            ..SaveState::default()
        });
        let save_tx = Arc::new(save_tx);
        Self {
            config,
            metrics: DebounceChannel::new("metrics"),
            save: DebounceChannel::new("save"),
            selection: DebounceChannel::new("selection"),
            stats_tx: Arc::new(stats_tx),
            selection_tx: Arc::new(selection_tx),
            persister: Arc::new(Persister {
                store,
                id: Mutex::new(id),
                state: save_tx.clone(),
            }),
            save_tx,
        }
    }

    pub fn config(&self) -> &AutosaveConfig {
        &self.config
    }

    /// Recompute stats from `text` after the metrics delay.
    pub fn arm_metrics(&mut self, text: String, detailed: bool) {
        let stats_tx = self.stats_tx.clone();
        self.metrics.arm(self.config.metrics_delay(), async move {
            stats_tx.send_modify(|stats| stats.refresh(&text, detailed));
        });
    }

    /// Recompute selection stats after the selection delay. Empty text
    /// clears them.
    pub fn arm_selection(&mut self, selected: String) {
        let selection_tx = self.selection_tx.clone();
        self.selection.arm(self.config.selection_delay(), async move {
            selection_tx.send_replace(selection_stats(&selected));
        });
    }

    /// Persist `snapshot` after `delay` unless another save is armed first.
    pub fn arm_save(&mut self, snapshot: SaveSnapshot, delay: Duration) {
        if !self.config.enabled {
            return;
        }
        let persister = self.persister.clone();
        self.save.arm(delay, async move {
            // failures are already logged and published
            let _ = persister.persist(snapshot).await;
        });
        if self.save.is_pending() {
            self.save_tx.send_modify(|state| state.status = SaveStatus::Pending);
        }
    }

    /// Save right away, dropping any pending save timer.
    pub async fn save_now(&mut self, snapshot: SaveSnapshot) -> Result<DocumentRecord, StorageError> {
        self.save.cancel();
        self.persister.persist(snapshot).await
    }

    /// Drop a pending save timer without touching one already running.
    pub fn cancel_save(&mut self) {
        if !self.save.is_pending() {
            return;
        }
        self.save.cancel();
        self.save_tx.send_modify(|state| {
            if state.status == SaveStatus::Pending {
                state.status = SaveStatus::Idle;
            }
        });
    }

    pub fn cancel_all(&mut self) {
        self.metrics.cancel();
        self.save.cancel();
        self.selection.cancel();
    }

    pub fn has_pending_save(&self) -> bool {
        self.save.is_pending()
    }

    pub fn stats(&self) -> StatsSnapshot {
        *self.stats_tx.borrow()
    }

    pub fn selection_stats(&self) -> Option<SelectionStats> {
        *self.selection_tx.borrow()
    }

    pub fn save_state(&self) -> SaveState {
        self.save_tx.borrow().clone()
    }

    pub fn subscribe_stats(&self) -> watch::Receiver<StatsSnapshot> {
        self.stats_tx.subscribe()
    }

    pub fn subscribe_selection(&self) -> watch::Receiver<Option<SelectionStats>> {
        self.selection_tx.subscribe()
    }

    pub fn subscribe_save_state(&self) -> watch::Receiver<SaveState> {
        self.save_tx.subscribe()
    }
}
