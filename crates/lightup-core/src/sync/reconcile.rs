//! Reconciliation of a pulled server alarm set into local storage.
//!
//! A pull is a full authoritative replace keyed on server ID: local alarms
//! matched by server ID take the server's fields, unmatched local alarms are
//! deleted and unmatched server alarms are inserted. Time of day and label
//! never take part in matching.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::codec::AlarmBatch;
use super::SyncResult;
use crate::db::{AlarmFilter, AlarmStore};
use crate::models::{Alarm, RemoteId};

/// A single local-storage change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Store the merged alarm without bumping its timestamp
    Update(Alarm),
    /// Remove a local alarm the server no longer has
    Delete(Alarm),
    /// Store a server alarm with no local counterpart
    Insert(Alarm),
}

/// Mutations computed from one server snapshot and one local snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub mutations: Vec<Mutation>,
    /// Matched local alarms already equal to their server record
    pub unchanged: usize,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

/// Compute the mutations that converge `local` to `server`.
///
/// Each server record is consumed by at most one local alarm. When several
/// local alarms carry the same server ID, the first one in `local` order
/// keeps it and the rest are deleted.
pub fn plan(server: Vec<Alarm>, local: &[Alarm]) -> ReconcilePlan {
    let mut slots = server.into_iter().map(Some).collect::<Vec<_>>();
    let mut by_remote_id = HashMap::<RemoteId, VecDeque<usize>>::new();
    for (index, alarm) in slots.iter().enumerate() {
        if let Some(remote_id) = alarm.as_ref().and_then(|alarm| alarm.remote_id) {
            by_remote_id.entry(remote_id).or_default().push_back(index);
        }
    }

    let mut plan = ReconcilePlan::default();
    for alarm in local {
        let matched = alarm
            .remote_id
            .and_then(|remote_id| by_remote_id.get_mut(&remote_id))
            .and_then(VecDeque::pop_front)
            .and_then(|index| slots[index].take());

        match matched {
            Some(server) => {
                let merged = alarm.merged_from_server(&server);
                if merged == *alarm {
                    plan.unchanged += 1;
                } else {
                    plan.mutations.push(Mutation::Update(merged));
                }
            }
            None => plan.mutations.push(Mutation::Delete(alarm.clone())),
        }
    }

    plan.mutations
        .extend(slots.into_iter().flatten().map(Mutation::Insert));
    plan
}

/// Counts of what a reconciliation pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub updated: usize,
    pub deleted: usize,
    pub inserted: usize,
    pub unchanged: usize,
    /// Mutations the store refused
    pub failed: usize,
    /// Server records left out because they could not be decoded
    pub skipped: usize,
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} updated, {} deleted, {} added, {} unchanged",
            self.updated, self.deleted, self.inserted, self.unchanged
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        Ok(())
    }
}

/// Apply `plan` one mutation at a time.
///
/// A failing mutation is logged and counted; the remaining mutations still run.
pub async fn apply<S: AlarmStore>(store: &S, plan: ReconcilePlan) -> ReconcileReport {
    let mut report = ReconcileReport {
        unchanged: plan.unchanged,
        ..ReconcileReport::default()
    };

    for mutation in plan.mutations {
        let result = match &mutation {
            Mutation::Update(alarm) => store.update(alarm, false).await.map(|_| ()),
            Mutation::Delete(alarm) => match alarm.id {
                Some(id) => store.delete(id).await,
                None => Err(crate::Error::InvalidInput(
                    "cannot delete an unsaved alarm".to_string(),
                )),
            },
            Mutation::Insert(alarm) => store.insert(alarm).await.map(|_| ()),
        };

        match (result, &mutation) {
            (Ok(()), Mutation::Update(alarm)) => {
                debug!(id = ?alarm.id, remote_id = ?alarm.remote_id, "Updated alarm from server");
                report.updated += 1;
            }
            (Ok(()), Mutation::Delete(alarm)) => {
                debug!(id = ?alarm.id, "Deleted alarm absent from server");
                report.deleted += 1;
            }
            (Ok(()), Mutation::Insert(alarm)) => {
                debug!(remote_id = ?alarm.remote_id, "Inserted alarm from server");
                report.inserted += 1;
            }
            (Err(error), mutation) => {
                warn!(?mutation, %error, "Failed to apply reconciliation mutation");
                report.failed += 1;
            }
        }
    }

    report
}

/// Converge local storage to a pulled server batch.
///
/// The local set is read once up front; if that read fails nothing is changed.
pub async fn reconcile<S: AlarmStore>(store: &S, batch: AlarmBatch) -> SyncResult<ReconcileReport> {
    let local = store.list(AlarmFilter::All).await?;
    let plan = plan(batch.alarms, &local);
    let mut report = apply(store, plan).await;
    report.skipped = batch.skipped;
    info!(%report, skipped = report.skipped, "Reconciled alarms with LightUpPi");
    Ok(report)
}

/// Admits at most one reconciliation at a time.
///
/// A ticket is taken when a push-to-phone is dispatched and released when
/// the ticket is dropped, after its reconciliation has been applied.
#[derive(Debug, Clone, Default)]
pub struct ReconcileGate {
    busy: Arc<AtomicBool>,
}

impl ReconcileGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the gate, or `None` if a reconciliation is already in flight
    pub fn try_acquire(&self) -> Option<ReconcileTicket> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ReconcileTicket {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Proof of holding the [`ReconcileGate`]
#[derive(Debug)]
pub struct ReconcileTicket {
    busy: Arc<AtomicBool>,
}

impl Drop for ReconcileTicket {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, LibSqlAlarmRepository};
    use crate::models::{AlarmId, DaysOfWeek, DEFAULT_ALERT_SOUND};
    use crate::Result;
    use pretty_assertions::assert_eq;

    fn server_alarm(id: i64, hour: u8, minute: u8, label: &str) -> Alarm {
        let mut alarm = Alarm::new(hour, minute).unwrap();
        alarm.remote_id = Some(RemoteId::new(id));
        alarm.label = label.to_string();
        alarm.days = DaysOfWeek::all();
        alarm.timestamp = 1_000 + id;
        alarm
    }

    fn remote_ids(alarms: &[Alarm]) -> Vec<i64> {
        let mut ids = alarms
            .iter()
            .filter_map(|alarm| alarm.remote_id.map(RemoteId::get))
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn scenario_updates_match_and_deletes_local_only() {
        let db = setup().await;
        let repo = LibSqlAlarmRepository::new(db.connection());

        let mut matched = Alarm::new(7, 0).unwrap();
        matched.remote_id = Some(RemoteId::new(1));
        matched.label = "Work".to_string();
        let matched = repo.insert(&matched).await.unwrap();
        let local_only = repo.insert(&Alarm::new(8, 0).unwrap()).await.unwrap();

        let batch = AlarmBatch {
            alarms: vec![server_alarm(1, 7, 30, "Work")],
            skipped: 0,
        };
        let report = reconcile(&repo, batch).await.unwrap();

        assert_eq!(
            report,
            ReconcileReport {
                updated: 1,
                deleted: 1,
                ..ReconcileReport::default()
            }
        );
        let updated = repo.get(matched.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(updated.minute, 30);
        assert_eq!(updated.timestamp, 1_001);
        assert!(repo.get(local_only.id.unwrap()).await.unwrap().is_none());
        assert_eq!(repo.list(AlarmFilter::All).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn converges_to_server_set() {
        let db = setup().await;
        let repo = LibSqlAlarmRepository::new(db.connection());

        for remote_id in [2, 3, 5] {
            let mut alarm = Alarm::new(6, 0).unwrap();
            alarm.remote_id = Some(RemoteId::new(remote_id));
            repo.insert(&alarm).await.unwrap();
        }
        repo.insert(&Alarm::new(9, 15).unwrap()).await.unwrap();

        let server = vec![
            server_alarm(1, 5, 0, "New"),
            server_alarm(2, 6, 10, "Changed"),
            server_alarm(3, 6, 0, ""),
            server_alarm(4, 22, 45, "Late"),
        ];
        reconcile(
            &repo,
            AlarmBatch {
                alarms: server.clone(),
                skipped: 0,
            },
        )
        .await
        .unwrap();

        let local = repo.list(AlarmFilter::All).await.unwrap();
        assert_eq!(remote_ids(&local), vec![1, 2, 3, 4]);
        for expected in &server {
            let stored = local
                .iter()
                .find(|alarm| alarm.remote_id == expected.remote_id)
                .unwrap();
            assert_eq!(stored.hour, expected.hour);
            assert_eq!(stored.minute, expected.minute);
            assert_eq!(stored.days, expected.days);
            assert_eq!(stored.enabled, expected.enabled);
            assert_eq!(stored.label, expected.label);
            assert_eq!(stored.timestamp, expected.timestamp);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_pass_is_a_no_op() {
        let db = setup().await;
        let repo = LibSqlAlarmRepository::new(db.connection());

        let mut stale = Alarm::new(6, 0).unwrap();
        stale.remote_id = Some(RemoteId::new(1));
        repo.insert(&stale).await.unwrap();
        repo.insert(&Alarm::new(7, 0).unwrap()).await.unwrap();

        let server = vec![server_alarm(1, 6, 30, "A"), server_alarm(2, 8, 0, "B")];
        let first = reconcile(
            &repo,
            AlarmBatch {
                alarms: server.clone(),
                skipped: 0,
            },
        )
        .await
        .unwrap();
        assert_eq!((first.updated, first.deleted, first.inserted), (1, 1, 1));

        let snapshot = repo.list(AlarmFilter::All).await.unwrap();
        let local_plan = plan(server.clone(), &snapshot);
        assert!(local_plan.is_empty());
        assert_eq!(local_plan.unchanged, 2);

        let second = reconcile(
            &repo,
            AlarmBatch {
                alarms: server,
                skipped: 0,
            },
        )
        .await
        .unwrap();
        assert_eq!(
            second,
            ReconcileReport {
                unchanged: 2,
                ..ReconcileReport::default()
            }
        );
        assert_eq!(repo.list(AlarmFilter::All).await.unwrap(), snapshot);
    }

    #[test]
    fn orphans_are_deleted_exactly_once() {
        let mut orphan = Alarm::new(5, 0).unwrap();
        orphan.id = Some(AlarmId::new(3));
        orphan.remote_id = Some(RemoteId::new(99));

        let plan = plan(vec![server_alarm(1, 7, 0, "")], &[orphan.clone()]);
        let deletes = plan
            .mutations
            .iter()
            .filter(|mutation| matches!(mutation, Mutation::Delete(alarm) if alarm.id == orphan.id))
            .count();
        assert_eq!(deletes, 1);
        assert!(matches!(plan.mutations.last(), Some(Mutation::Insert(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn inserted_alarms_get_local_defaults() {
        let db = setup().await;
        let repo = LibSqlAlarmRepository::new(db.connection());

        let decoded = crate::sync::codec::decode_alarm(
            crate::testing::server_alarm_json(4, 6, 0, "Decoded"),
            &crate::sync::DecodeDefaults::default(),
        )
        .unwrap();
        reconcile(
            &repo,
            AlarmBatch {
                alarms: vec![decoded],
                skipped: 0,
            },
        )
        .await
        .unwrap();

        let stored = repo
            .get_by_remote_id(RemoteId::new(4))
            .await
            .unwrap()
            .unwrap();
        assert!(stored.id.is_some());
        assert!(stored.vibrate);
        assert!(!stored.delete_after_use);
        assert_eq!(stored.alert, DEFAULT_ALERT_SOUND);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn matched_alarms_keep_local_fields() {
        let db = setup().await;
        let repo = LibSqlAlarmRepository::new(db.connection());

        let mut local = Alarm::new(6, 0).unwrap();
        local.remote_id = Some(RemoteId::new(1));
        local.alert = "content://media/internal/audio/media/31".to_string();
        local.vibrate = false;
        local.delete_after_use = true;
        let local = repo.insert(&local).await.unwrap();

        reconcile(
            &repo,
            AlarmBatch {
                alarms: vec![server_alarm(1, 7, 15, "Server")],
                skipped: 0,
            },
        )
        .await
        .unwrap();

        let stored = repo.get(local.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.id, local.id);
        assert_eq!(stored.alert, local.alert);
        assert!(!stored.vibrate);
        assert!(stored.delete_after_use);
        assert_eq!(stored.label, "Server");
    }

    #[test]
    fn duplicate_local_remote_ids_keep_one() {
        let mut first = Alarm::new(6, 0).unwrap();
        first.id = Some(AlarmId::new(1));
        first.remote_id = Some(RemoteId::new(7));
        let mut second = first.clone();
        second.id = Some(AlarmId::new(2));

        let plan = plan(vec![server_alarm(7, 6, 0, "")], &[first, second]);
        assert_eq!(plan.mutations.len(), 2);
        assert!(matches!(
            &plan.mutations[0],
            Mutation::Update(alarm) if alarm.id == Some(AlarmId::new(1))
        ));
        assert!(matches!(
            &plan.mutations[1],
            Mutation::Delete(alarm) if alarm.id == Some(AlarmId::new(2))
        ));
    }

    #[test]
    fn identical_times_never_match_without_server_id() {
        let mut local = server_alarm(1, 7, 30, "Work");
        local.id = Some(AlarmId::new(1));
        local.remote_id = None;

        let plan = plan(vec![server_alarm(1, 7, 30, "Work")], &[local]);
        assert!(matches!(&plan.mutations[0], Mutation::Delete(_)));
        assert!(matches!(&plan.mutations[1], Mutation::Insert(_)));
    }

    /// Store that refuses updates to one alarm
    struct FlakyStore<'a> {
        inner: LibSqlAlarmRepository<'a>,
        broken: AlarmId,
    }

    impl AlarmStore for FlakyStore<'_> {
        async fn get(&self, id: AlarmId) -> Result<Option<Alarm>> {
            self.inner.get(id).await
        }

        async fn get_by_remote_id(&self, remote_id: RemoteId) -> Result<Option<Alarm>> {
            self.inner.get_by_remote_id(remote_id).await
        }

        async fn list(&self, filter: AlarmFilter) -> Result<Vec<Alarm>> {
            self.inner.list(filter).await
        }

        async fn insert(&self, alarm: &Alarm) -> Result<Alarm> {
            self.inner.insert(alarm).await
        }

        async fn update(&self, alarm: &Alarm, bump_timestamp: bool) -> Result<Alarm> {
            if alarm.id == Some(self.broken) {
                return Err(crate::Error::Database("disk I/O error".to_string()));
            }
            self.inner.update(alarm, bump_timestamp).await
        }

        async fn delete(&self, id: AlarmId) -> Result<()> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_mutation_does_not_stop_the_pass() {
        let db = setup().await;
        let repo = LibSqlAlarmRepository::new(db.connection());

        let mut broken = Alarm::new(6, 0).unwrap();
        broken.remote_id = Some(RemoteId::new(1));
        let broken = repo.insert(&broken).await.unwrap();
        let orphan = repo.insert(&Alarm::new(7, 0).unwrap()).await.unwrap();

        let store = FlakyStore {
            inner: LibSqlAlarmRepository::new(db.connection()),
            broken: broken.id.unwrap(),
        };
        let report = reconcile(
            &store,
            AlarmBatch {
                alarms: vec![server_alarm(1, 6, 45, ""), server_alarm(2, 9, 0, "")],
                skipped: 3,
            },
        )
        .await
        .unwrap();

        assert_eq!(
            report,
            ReconcileReport {
                deleted: 1,
                inserted: 1,
                failed: 1,
                skipped: 3,
                ..ReconcileReport::default()
            }
        );
        assert!(repo.get(orphan.id.unwrap()).await.unwrap().is_none());
        assert!(repo
            .get_by_remote_id(RemoteId::new(2))
            .await
            .unwrap()
            .is_some());
    }

    #[test]
    fn gate_admits_one_ticket_at_a_time() {
        let gate = ReconcileGate::new();
        let ticket = gate.try_acquire().unwrap();
        assert!(gate.is_busy());
        assert!(gate.clone().try_acquire().is_none());

        drop(ticket);
        assert!(!gate.is_busy());
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn report_display() {
        let report = ReconcileReport {
            updated: 1,
            deleted: 2,
            inserted: 3,
            unchanged: 4,
            failed: 1,
            skipped: 0,
        };
        assert_eq!(
            report.to_string(),
            "1 updated, 2 deleted, 3 added, 4 unchanged, 1 failed"
        );
    }
}
