//! Sync engine: fetch-compare-reconcile against the remote store.
//!
//! Triggers: a debounce timer after local mutation, the offline->online
//! transition, and a periodic fallback interval. All of them funnel into
//! [`SyncEngine::sync_now`], which is guarded by a single in-flight flag:
//! re-entrant triggers are dropped, never queued, and the next scheduled
//! tick re-attempts. A reconciliation pass is re-entrant rather than
//! transactional — a failure aborts the remainder of the pass without
//! reverting remote writes already applied.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::watch;

use crate::backend::{BackendError, BoardBackend};
use crate::merge::{merge_cards, merge_lists, ConflictPolicy, FieldConflict};
use crate::queue::{OfflineQueue, RemoteOp};
use crate::storage::StorageError;
use crate::store::{BoardStore, Intent, IntentError};
use crate::types::{
    generate_id, timestamp_millis, BoardSnapshot, Card, CardPatch, List, ListPatch,
};

fn default_debounce_ms() -> u64 {
    1_000
}
fn default_interval_ms() -> u64 {
    30_000
}
fn default_grace_ms() -> i64 {
    5_000
}
fn default_history_capacity() -> usize {
    crate::undo::DEFAULT_HISTORY_CAPACITY
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// Delay after a local mutation before a sync pass starts.
    pub debounce_ms: u64,
    /// Periodic fallback sync interval while online.
    pub interval_ms: u64,
    /// Minimum age a remote-only card must have before it is treated as
    /// safely deletable rather than "not yet locally visible".
    pub deletion_grace_ms: i64,
    pub conflict_policy: ConflictPolicy,
    /// Undo history bound, handed to [`crate::store::BoardStore::open`].
    pub history_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            interval_ms: default_interval_ms(),
            deletion_grace_ms: default_grace_ms(),
            conflict_policy: ConflictPolicy::default(),
            history_capacity: default_history_capacity(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    List,
    Card,
}

/// Auto-resolved merge conflict, recorded for observability.
#[derive(Debug, Clone)]
pub struct ConflictRecord {
    pub entity: EntityKind,
    pub id: String,
    pub fields: Vec<FieldConflict>,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Another pass was in flight; this trigger was dropped.
    pub skipped: bool,
    pub pushed_lists: usize,
    pub pushed_cards: usize,
    pub deleted_lists: usize,
    pub deleted_cards: usize,
    pub conflicts: Vec<ConflictRecord>,
    /// Set when the pass aborted; the next scheduled trigger retries.
    pub error: Option<String>,
}

impl SyncReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

pub struct SyncEngine<B> {
    backend: B,
    store: Arc<BoardStore>,
    queue: OfflineQueue,
    config: SyncConfig,
    /// Last-known-synced snapshot: the common ancestor for three-way merges.
    base: Mutex<BoardSnapshot>,
    in_flight: AtomicBool,
    /// Restored snapshot whose remote replay could not run yet. The next
    /// pass replays it before reconciling; the restored entities carry
    /// older timestamps, so the newer-wins push would never repair the
    /// remote on its own.
    pending_replay: Mutex<Option<BoardSnapshot>>,
    online: watch::Sender<bool>,
}

impl<B: BoardBackend> SyncEngine<B> {
    pub fn new(backend: B, store: Arc<BoardStore>, queue: OfflineQueue, config: SyncConfig) -> Self {
        let (online, _) = watch::channel(true);
        Self {
            backend,
            store,
            queue,
            config,
            base: Mutex::new(BoardSnapshot::default()),
            in_flight: AtomicBool::new(false),
            pending_replay: Mutex::new(None),
            online,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn store(&self) -> &Arc<BoardStore> {
        &self.store
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Feed a connectivity transition into the engine. The run loop
    /// reacts to offline->online by draining the queue and reconciling.
    pub fn set_online(&self, online: bool) {
        if self.online.send_replace(online) != online {
            log::info!(
                "[driftboard.sync] Connectivity changed: {}",
                if online { "online" } else { "offline" }
            );
        }
    }

    /// Number of queued remote operations awaiting replay.
    pub fn pending_ops(&self) -> usize {
        self.queue.pending()
    }

    /// Apply a local intent. While offline the corresponding remote
    /// operation is enqueued for replay; while online the debounced run
    /// loop picks the mutation up via the store's revision counter.
    pub fn apply(&self, intent: Intent) -> Result<bool, IntentError> {
        let intent = with_concrete_ids(intent);
        if !self.store.dispatch(&intent)? {
            return Ok(false);
        }
        if !self.is_online() {
            if let Some(op) = self.op_for(&intent) {
                self.queue.enqueue(op)?;
            }
        }
        Ok(true)
    }

    fn op_for(&self, intent: &Intent) -> Option<RemoteOp> {
        let op = match intent {
            Intent::AddList { id, .. } => {
                let id = id.as_deref()?;
                RemoteOp::CreateList(self.store.snapshot().find_list(id)?.clone())
            }
            Intent::UpdateList { id, patch } => RemoteOp::UpdateList {
                id: id.clone(),
                updates: patch.clone(),
            },
            Intent::ArchiveList { id } => RemoteOp::UpdateList {
                id: id.clone(),
                updates: ListPatch {
                    archived: Some(true),
                    ..ListPatch::default()
                },
            },
            Intent::DeleteList { id } => RemoteOp::DeleteList { id: id.clone() },
            Intent::AddCard { id, .. } => {
                let id = id.as_deref()?;
                RemoteOp::CreateCard(self.store.snapshot().find_card(id)?.clone())
            }
            Intent::UpdateCard { id, patch } => RemoteOp::UpdateCard {
                id: id.clone(),
                updates: patch.clone(),
            },
            Intent::DeleteCard { id } => RemoteOp::DeleteCard { id: id.clone() },
            Intent::MoveCard {
                card_id,
                target_list_id,
                target_index,
            } => RemoteOp::MoveCard {
                card_id: card_id.clone(),
                target_list_id: target_list_id.clone(),
                target_index: *target_index,
            },
        };
        Some(op)
    }

    /// Initial load: prefer the remote board, fall back to whatever the
    /// durable log restored when the backend is unreachable.
    pub async fn bootstrap(&self) -> Result<(), StorageError> {
        self.store.set_loading(true);
        match self.backend.fetch_all().await {
            Ok(data) => {
                self.store.replace_board(data.clone())?;
                *self.base.lock().unwrap() = data;
                self.store.set_last_synced(timestamp_millis());
            }
            Err(e) => {
                log::warn!("[driftboard.sync] Backend unavailable, using local data: {e}");
            }
        }
        self.store.set_loading(false);
        Ok(())
    }

    /// Run one reconciliation pass now, unless one is already in flight
    /// (in which case the trigger is dropped and the report says so).
    /// Failures are logged and recorded, never raised: background sync
    /// must not take the local session down.
    pub async fn sync_now(&self) -> SyncReport {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return SyncReport::skipped();
        }
        let result: Result<SyncReport, SyncError> = async {
            self.flush_pending_replay().await?;
            self.reconcile().await
        }
        .await;
        self.in_flight.store(false, Ordering::SeqCst);

        match result {
            Ok(report) => {
                self.store.set_last_synced(timestamp_millis());
                for record in &report.conflicts {
                    log::warn!(
                        "[driftboard.sync] Auto-resolved conflict on {:?} {}: {} field(s)",
                        record.entity,
                        record.id,
                        record.fields.len()
                    );
                }
                report
            }
            Err(e) => {
                log::warn!("[driftboard.sync] Reconciliation aborted: {e}");
                self.store.set_error(Some(format!("Sync failed: {e}")));
                SyncReport {
                    error: Some(e.to_string()),
                    ..SyncReport::default()
                }
            }
        }
    }

    async fn reconcile(&self) -> Result<SyncReport, SyncError> {
        // Queued offline operations replay before the diff pass, so the
        // remote reflects them when we fetch it.
        self.queue.drain(&self.backend).await?;

        let local = self.store.snapshot();
        let base = self.base.lock().unwrap().clone();
        let remote = self.backend.fetch_all().await?;
        let mut report = SyncReport::default();

        for list in &local.lists {
            match remote.find_list(&list.id) {
                None => {
                    tolerate_status(self.backend.create_list(list).await.map(drop), 409)?;
                    report.pushed_lists += 1;
                }
                Some(remote_list) if list.last_modified_at > remote_list.last_modified_at => {
                    let outcome = merge_lists(
                        base.find_list(&list.id),
                        list,
                        remote_list,
                        self.config.conflict_policy,
                    );
                    if outcome.has_conflict {
                        report.conflicts.push(ConflictRecord {
                            entity: EntityKind::List,
                            id: list.id.clone(),
                            fields: outcome.conflicts.clone(),
                        });
                    }
                    let patch = full_list_patch(&outcome.merged);
                    tolerate_status(self.backend.update_list(&list.id, &patch).await.map(drop), 404)?;
                    report.pushed_lists += 1;
                }
                Some(_) => {}
            }
        }

        // A list we no longer have locally was deleted here: local
        // deletion is authoritative intent.
        for remote_list in &remote.lists {
            if local.find_list(&remote_list.id).is_none() {
                tolerate_status(self.backend.delete_list(&remote_list.id).await, 404)?;
                report.deleted_lists += 1;
            }
        }

        for card in &local.cards {
            match remote.find_card(&card.id) {
                None => {
                    tolerate_status(self.backend.create_card(card).await.map(drop), 409)?;
                    report.pushed_cards += 1;
                }
                Some(remote_card) if card.last_modified_at > remote_card.last_modified_at => {
                    let outcome = merge_cards(
                        base.find_card(&card.id),
                        card,
                        remote_card,
                        self.config.conflict_policy,
                    );
                    if outcome.has_conflict {
                        report.conflicts.push(ConflictRecord {
                            entity: EntityKind::Card,
                            id: card.id.clone(),
                            fields: outcome.conflicts.clone(),
                        });
                    }
                    let patch = full_card_patch(&outcome.merged);
                    tolerate_status(self.backend.update_card(&card.id, &patch).await.map(drop), 404)?;
                    report.pushed_cards += 1;
                }
                Some(_) => {}
            }
        }

        // Remote-only cards are deleted only once they are older than the
        // grace window; a card another writer created moments ago may not
        // have propagated locally yet.
        let now = timestamp_millis();
        for remote_card in &remote.cards {
            if local.find_card(&remote_card.id).is_none()
                && now - remote_card.last_modified_at > self.config.deletion_grace_ms
            {
                tolerate_status(self.backend.delete_card(&remote_card.id).await, 404)?;
                report.deleted_cards += 1;
            }
        }

        // Checkpoint: the next merge diffs against what we just synced.
        *self.base.lock().unwrap() = self.store.snapshot();
        Ok(report)
    }

    /// Undo one step. The restored snapshot is replayed to the remote as
    /// a full recreate (delete everything, then rebuild from the
    /// snapshot) — undo is rare and user-deliberate, so the simple path
    /// beats a diff.
    pub async fn undo(&self) -> Result<Option<BoardSnapshot>, StorageError> {
        let Some(snapshot) = self.store.undo()? else {
            return Ok(None);
        };
        self.replay_snapshot(&snapshot).await;
        Ok(Some(snapshot))
    }

    /// Symmetric to [`SyncEngine::undo`].
    pub async fn redo(&self) -> Result<Option<BoardSnapshot>, StorageError> {
        let Some(snapshot) = self.store.redo()? else {
            return Ok(None);
        };
        self.replay_snapshot(&snapshot).await;
        Ok(Some(snapshot))
    }

    async fn replay_snapshot(&self, snapshot: &BoardSnapshot) {
        if !self.is_online() {
            return;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::warn!("[driftboard.sync] Reconciliation in flight, remote replay queued for next pass");
            *self.pending_replay.lock().unwrap() = Some(snapshot.clone());
            return;
        }
        let result = self.recreate_remote(snapshot).await;
        self.in_flight.store(false, Ordering::SeqCst);
        if let Err(e) = result {
            log::warn!("[driftboard.sync] Remote replay of restored snapshot failed, queued for retry: {e}");
            *self.pending_replay.lock().unwrap() = Some(snapshot.clone());
        }
    }

    /// Replay a deferred restored snapshot, if one is queued. Runs under
    /// the in-flight flag, before the drain/reconcile steps of a pass.
    async fn flush_pending_replay(&self) -> Result<(), BackendError> {
        let pending = self.pending_replay.lock().unwrap().take();
        let Some(snapshot) = pending else {
            return Ok(());
        };
        if let Err(e) = self.recreate_remote(&snapshot).await {
            *self.pending_replay.lock().unwrap() = Some(snapshot);
            return Err(e);
        }
        Ok(())
    }

    async fn recreate_remote(&self, snapshot: &BoardSnapshot) -> Result<(), BackendError> {
        let remote = self.backend.fetch_all().await?;
        for card in &remote.cards {
            tolerate_status(self.backend.delete_card(&card.id).await, 404)?;
        }
        for list in &remote.lists {
            tolerate_status(self.backend.delete_list(&list.id).await, 404)?;
        }

        let mut lists: Vec<&List> = snapshot.lists.iter().collect();
        lists.sort_by_key(|l| l.order);
        for list in lists {
            tolerate_status(self.backend.create_list(list).await.map(drop), 409)?;
        }
        let mut cards: Vec<&Card> = snapshot.cards.iter().collect();
        cards.sort_by_key(|c| c.order);
        for card in cards {
            tolerate_status(self.backend.create_card(card).await.map(drop), 409)?;
        }

        *self.base.lock().unwrap() = snapshot.clone();
        Ok(())
    }

    /// Drive the trigger loop: debounced local mutations, the periodic
    /// fallback interval, and reconnect events. Runs until the engine is
    /// dropped; callers stop it by dropping the future.
    pub async fn run(&self) {
        let mut revision = self.store.subscribe();
        let mut online_rx = self.online.subscribe();
        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.interval_ms));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = revision.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(self.config.debounce_ms)).await;
                    // Coalesce every mutation that arrived during the debounce.
                    revision.borrow_and_update();
                    if self.is_online() && !self.store.state().is_loading {
                        self.sync_now().await;
                    }
                }
                _ = ticker.tick() => {
                    if self.is_online() {
                        self.sync_now().await;
                    }
                }
                changed = online_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if *online_rx.borrow_and_update() {
                        log::info!("[driftboard.sync] Back online, reconciling");
                        self.sync_now().await;
                    }
                }
            }
        }
    }
}

fn with_concrete_ids(intent: Intent) -> Intent {
    match intent {
        Intent::AddList { id: None, title } => Intent::AddList {
            id: Some(generate_id()),
            title,
        },
        Intent::AddCard {
            id: None,
            list_id,
            title,
            description,
            tags,
        } => Intent::AddCard {
            id: Some(generate_id()),
            list_id,
            title,
            description,
            tags,
        },
        other => other,
    }
}

/// Treat the given HTTP status as success (idempotent re-application).
fn tolerate_status(result: Result<(), BackendError>, status: u16) -> Result<(), BackendError> {
    match result {
        Err(e) if e.status() == Some(status) => {
            log::debug!("[driftboard.sync] Tolerated {status}: {e}");
            Ok(())
        }
        other => other,
    }
}

fn full_list_patch(list: &List) -> ListPatch {
    ListPatch {
        title: Some(list.title.clone()),
        archived: Some(list.archived),
        order: Some(list.order),
    }
}

fn full_card_patch(card: &Card) -> CardPatch {
    CardPatch {
        list_id: Some(card.list_id.clone()),
        title: Some(card.title.clone()),
        description: Some(card.description.clone()),
        tags: Some(card.tags.clone()),
        order: Some(card.order),
    }
}
