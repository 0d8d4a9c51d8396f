//! Dispatch of sync verbs as background units with a post-work phase on the
//! owning context.
//!
//! [`SyncOrchestrator::dispatch`] runs the guards, signals progress and spawns
//! the network phase. Finished units come back as [`Completion`]s over a
//! channel; the owner applies them with [`SyncOrchestrator::complete`], which
//! is where local storage is written and the outcome is reported.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::client::LightUpPiClient;
use super::codec::{AlarmBatch, DecodeDefaults, EditAck};
use super::connectivity::Connectivity;
use super::outcome::{OutcomeSink, SyncKind, SyncOutcome};
use super::reconcile::{self, ReconcileGate, ReconcileTicket};
use super::{SyncError, SyncResult};
use crate::db::AlarmStore;
use crate::models::{Alarm, AlarmId, RemoteId};

/// A sync verb and its input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncRequest {
    /// Pull one alarm by server ID and merge it locally
    Get(RemoteId),
    /// Pull every server alarm and reconcile local storage to it
    PushToPhone,
    /// Create a saved local-only alarm on the server
    Add(Alarm),
    /// Send a synced alarm's current state to the server
    Edit(Alarm),
    /// Remove a synced alarm from the server
    Delete(Alarm),
}

impl SyncRequest {
    pub const fn kind(&self) -> SyncKind {
        match self {
            Self::Get(_) => SyncKind::Get,
            Self::PushToPhone => SyncKind::PushToPhone,
            Self::Add(_) => SyncKind::Add,
            Self::Edit(_) => SyncKind::Edit,
            Self::Delete(_) => SyncKind::Delete,
        }
    }
}

/// Result of a unit's network phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    Synced(Alarm),
    PushedToPhone(AlarmBatch),
    Added {
        local_id: AlarmId,
        remote_id: RemoteId,
    },
    Edited(EditAck),
    Deleted,
}

/// A finished unit waiting for its post-work phase
#[derive(Debug)]
pub struct Completion {
    pub kind: SyncKind,
    pub result: SyncResult<TaskResult>,
    ticket: Option<ReconcileTicket>,
}

/// How [`SyncOrchestrator::save_local`] writes an alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Set the alarm's timestamp to now
    pub bump_timestamp: bool,
    /// Follow the write with an edit request when the alarm is synced
    pub push_to_server: bool,
}

impl UpdateOptions {
    /// A user edit: new timestamp, pushed to the server
    pub const LOCAL_EDIT: Self = Self {
        bump_timestamp: true,
        push_to_server: true,
    };

    /// Data that came from the server: stored as-is, never pushed back
    pub const FROM_SERVER: Self = Self {
        bump_timestamp: false,
        push_to_server: false,
    };
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self::LOCAL_EDIT
    }
}

pub struct SyncOrchestrator<S, O> {
    client: Arc<LightUpPiClient>,
    connectivity: Arc<dyn Connectivity>,
    store: S,
    outcomes: O,
    defaults: DecodeDefaults,
    gate: ReconcileGate,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
}

impl<S: AlarmStore, O: OutcomeSink> SyncOrchestrator<S, O> {
    pub fn new(
        client: Arc<LightUpPiClient>,
        connectivity: Arc<dyn Connectivity>,
        store: S,
        outcomes: O,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            client,
            connectivity,
            store,
            outcomes,
            defaults: DecodeDefaults::default(),
            gate: ReconcileGate::new(),
            completions_tx,
            completions_rx,
            in_flight: 0,
        }
    }

    /// Use `defaults` for the local-only fields of alarms pulled from the server
    #[must_use]
    pub fn with_defaults(mut self, defaults: DecodeDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn outcomes(&self) -> &O {
        &self.outcomes
    }

    pub fn client(&self) -> &LightUpPiClient {
        &self.client
    }

    /// Units dispatched whose post-work phase has not run yet
    pub const fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Start a sync unit.
    ///
    /// Guards run first and report their outcome immediately without any
    /// network call: add of a synced alarm, edit or delete of a local-only
    /// alarm, no connectivity, and push-to-phone while another is in flight.
    /// Returns `true` if a unit was spawned; its outcome is reported when
    /// the matching [`Completion`] is passed to [`Self::complete`].
    pub fn dispatch(&mut self, request: SyncRequest) -> bool {
        let kind = request.kind();

        if let Some(outcome) = precheck(&request) {
            debug!(%kind, "Sync request refused before dispatch");
            self.outcomes.report(kind, &outcome);
            return false;
        }

        let ticket = match self.admit(&request) {
            Ok(ticket) => ticket,
            Err(error) => {
                info!(%kind, %error, "Sync request refused");
                self.outcomes.report(kind, &SyncOutcome::from_error(kind, &error));
                return false;
            }
        };

        self.outcomes.progress_started(kind);

        let client = Arc::clone(&self.client);
        let defaults = self.defaults.clone();
        let completions = self.completions_tx.clone();
        let work = tokio::spawn(async move { run(&client, &defaults, request).await });
        tokio::spawn(async move {
            let result = work.await.unwrap_or_else(|error| {
                Err(SyncError::Network(format!("sync task failed: {error}")))
            });
            let completion = Completion {
                kind,
                result,
                ticket,
            };
            if completions.send(completion).is_err() {
                debug!(%kind, "Orchestrator dropped before sync completed");
            }
        });

        self.in_flight += 1;
        true
    }

    /// Connectivity gate, then the reconciliation gate for push-to-phone
    fn admit(&self, request: &SyncRequest) -> SyncResult<Option<ReconcileTicket>> {
        if !self.connectivity.is_connected() {
            return Err(SyncError::NoConnectivity);
        }
        if matches!(request, SyncRequest::PushToPhone) {
            return self.gate.try_acquire().map(Some).ok_or(SyncError::Busy);
        }
        Ok(None)
    }

    pub fn get(&mut self, remote_id: RemoteId) -> bool {
        self.dispatch(SyncRequest::Get(remote_id))
    }

    pub fn push_to_phone(&mut self) -> bool {
        self.dispatch(SyncRequest::PushToPhone)
    }

    pub fn add(&mut self, alarm: Alarm) -> bool {
        self.dispatch(SyncRequest::Add(alarm))
    }

    pub fn edit(&mut self, alarm: Alarm) -> bool {
        self.dispatch(SyncRequest::Edit(alarm))
    }

    pub fn delete(&mut self, alarm: Alarm) -> bool {
        self.dispatch(SyncRequest::Delete(alarm))
    }

    /// Wait for the next finished unit, or `None` when nothing is in flight
    pub async fn next_completion(&mut self) -> Option<Completion> {
        if self.in_flight == 0 {
            return None;
        }
        let completion = self.completions_rx.recv().await?;
        self.in_flight -= 1;
        Some(completion)
    }

    /// Post-work phase of a unit: end progress, apply the result locally,
    /// report the outcome.
    pub async fn complete(&mut self, completion: Completion) -> SyncOutcome {
        let Completion {
            kind,
            result,
            ticket,
        } = completion;
        self.outcomes.progress_finished(kind);

        let outcome = match result {
            Ok(result) => match self.apply(kind, result).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    warn!(%kind, %error, "Failed to store LightUpPi sync result");
                    SyncOutcome::from_error(kind, &error)
                }
            },
            Err(error) => {
                warn!(%kind, %error, "LightUpPi sync failed");
                SyncOutcome::from_error(kind, &error)
            }
        };
        drop(ticket);

        self.outcomes.report(kind, &outcome);
        outcome
    }

    /// Complete every unit in flight, in the order they finish
    pub async fn finish_pending(&mut self) -> Vec<SyncOutcome> {
        let mut outcomes = Vec::new();
        while let Some(completion) = self.next_completion().await {
            outcomes.push(self.complete(completion).await);
        }
        outcomes
    }

    async fn apply(&self, kind: SyncKind, result: TaskResult) -> SyncResult<SyncOutcome> {
        match result {
            TaskResult::Synced(server) => {
                let Some(remote_id) = server.remote_id else {
                    return Err(SyncError::Decode("server alarm has no id".to_string()));
                };
                match self.store.get_by_remote_id(remote_id).await? {
                    Some(local) => {
                        self.store
                            .update(&local.merged_from_server(&server), false)
                            .await?;
                    }
                    None => {
                        self.store.insert(&server).await?;
                    }
                }
                Ok(SyncOutcome::Refreshed)
            }
            TaskResult::PushedToPhone(batch) => {
                let report = reconcile::reconcile(&self.store, batch).await?;
                Ok(SyncOutcome::PushedToPhone(report))
            }
            TaskResult::Added {
                local_id,
                remote_id,
            } => {
                let Some(mut alarm) = self.store.get(local_id).await? else {
                    warn!(%local_id, %remote_id, "Alarm deleted locally before add completed");
                    return Ok(SyncOutcome::Failed(kind));
                };
                alarm.remote_id = Some(remote_id);
                self.store.update(&alarm, false).await?;
                info!(%local_id, %remote_id, "Alarm added to LightUpPi");
                Ok(SyncOutcome::Added)
            }
            TaskResult::Edited(ack) => {
                match self.store.get_by_remote_id(ack.remote_id).await? {
                    Some(mut alarm) => {
                        alarm.timestamp = ack.timestamp;
                        self.store.update(&alarm, false).await?;
                    }
                    None => {
                        warn!(remote_id = %ack.remote_id, "Edited alarm no longer stored locally");
                    }
                }
                Ok(SyncOutcome::Edited)
            }
            TaskResult::Deleted => Ok(SyncOutcome::Deleted),
        }
    }

    /// Write an alarm to local storage.
    ///
    /// Unsaved alarms are inserted; saved ones are updated per `options`.
    /// With `push_to_server`, a synced alarm is then dispatched as an edit.
    pub async fn save_local(&mut self, alarm: &Alarm, options: UpdateOptions) -> SyncResult<Alarm> {
        let stored = if alarm.id.is_some() {
            self.store.update(alarm, options.bump_timestamp).await?
        } else {
            self.store.insert(alarm).await?
        };
        if options.push_to_server && stored.is_synced() {
            self.edit(stored.clone());
        }
        Ok(stored)
    }

    /// Delete an alarm locally, and with `cascade` also from the server
    pub async fn delete_local(&mut self, alarm: &Alarm, cascade: bool) -> SyncResult<()> {
        let id = alarm.id.ok_or_else(|| {
            SyncError::Store(crate::Error::InvalidInput(
                "cannot delete an unsaved alarm".to_string(),
            ))
        })?;
        self.store.delete(id).await?;
        if cascade && alarm.is_synced() {
            self.delete(alarm.clone());
        }
        Ok(())
    }
}

/// Outcome of a request refused without a network call
const fn precheck(request: &SyncRequest) -> Option<SyncOutcome> {
    match request {
        SyncRequest::Add(alarm) if alarm.remote_id.is_some() => Some(SyncOutcome::AlreadyOnServer),
        SyncRequest::Add(alarm) if alarm.id.is_none() => Some(SyncOutcome::Failed(SyncKind::Add)),
        SyncRequest::Edit(alarm) | SyncRequest::Delete(alarm) if alarm.remote_id.is_none() => {
            Some(SyncOutcome::NoServerId)
        }
        _ => None,
    }
}

/// Network phase of a unit
async fn run(
    client: &LightUpPiClient,
    defaults: &DecodeDefaults,
    request: SyncRequest,
) -> SyncResult<TaskResult> {
    match request {
        SyncRequest::Get(remote_id) => client
            .fetch_alarm(remote_id, defaults)
            .await
            .map(TaskResult::Synced),
        SyncRequest::PushToPhone => client
            .fetch_all_alarms(defaults)
            .await
            .map(TaskResult::PushedToPhone),
        SyncRequest::Add(alarm) => {
            let local_id = alarm.id.ok_or_else(|| {
                SyncError::Store(crate::Error::InvalidInput(
                    "cannot add an unsaved alarm".to_string(),
                ))
            })?;
            let remote_id = client.add_alarm(&alarm).await?;
            Ok(TaskResult::Added {
                local_id,
                remote_id,
            })
        }
        SyncRequest::Edit(alarm) => client.edit_alarm(&alarm).await.map(TaskResult::Edited),
        SyncRequest::Delete(alarm) => {
            let remote_id = alarm.remote_id.ok_or(SyncError::MissingServerId)?;
            client.delete_alarm(remote_id).await?;
            Ok(TaskResult::Deleted)
        }
    }
}
