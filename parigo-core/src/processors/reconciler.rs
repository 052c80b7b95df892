//! Polling reconciler: diffs recent store activity against the snapshot
//! cache and publishes one event per detected drift.
//!
//! The loop schedules the next cycle from the completion of the previous
//! one, so a slow store read can never make cycles overlap. A failing
//! sub-check (balances, deposits, withdrawals, transaction tails) is
//! logged and skipped for that cycle; the remaining sub-checks and the
//! loop itself keep running.

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;

use crate::entities::transactions;
use crate::events::types::{Change, ChangeEvent, MonitorStatusEvent, StreamEvent};
use crate::events::EventBroadcaster;
use crate::store::StateStore;

use super::snapshot::{EntityId, Observation, ObservedValue, SnapshotCache};
use super::stats::{MonitorStats, StatsSnapshot};

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Pause between the end of one cycle and the start of the next.
    pub poll_interval: std::time::Duration,
    /// How far back the windowed store queries look.
    pub recency_window: time::Duration,
    /// Cache entries not observed within this long are evicted.
    pub snapshot_ttl: time::Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            poll_interval: std::time::Duration::from_secs(5),
            recency_window: time::Duration::minutes(5),
            snapshot_ttl: time::Duration::minutes(30),
        }
    }
}

pub struct Reconciler<S: StateStore> {
    store: S,
    events: EventBroadcaster,
    config: ReconcilerConfig,
    cache: SnapshotCache,
    stats: Arc<RwLock<MonitorStats>>,
    next_seq: u64,
}

impl<S: StateStore> Reconciler<S> {
    pub fn new(store: S, events: EventBroadcaster, config: ReconcilerConfig) -> Self {
        let cache = SnapshotCache::new(config.snapshot_ttl);
        Self {
            store,
            events,
            config,
            cache,
            stats: Arc::new(RwLock::new(MonitorStats::default())),
            next_seq: 1,
        }
    }

    /// Shared handle to the counters, for read endpoints.
    pub fn stats_handle(&self) -> Arc<RwLock<MonitorStats>> {
        Arc::clone(&self.stats)
    }

    /// Run the polling loop until the shutdown flag flips.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        tracing::info!(
            poll_interval = ?self.config.poll_interval,
            "consistency monitor started"
        );
        loop {
            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    // a dropped sender also means shutdown
                    if changed.is_err() || *shutdown_rx.borrow() {
                        tracing::info!("consistency monitor stopping");
                        return;
                    }
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {
                    self.run_cycle().await;
                }
            }
        }
    }

    /// One reconciliation cycle: read, diff, evict, publish.
    pub async fn run_cycle(&mut self) {
        let now = OffsetDateTime::now_utc();
        let mut changes = Vec::new();

        if let Err(err) = self.check_balances(now, &mut changes).await {
            tracing::warn!(error = %err, "balance check failed, skipping this cycle");
        }
        if let Err(err) = self.check_deposits(now, &mut changes).await {
            tracing::warn!(error = %err, "deposit check failed, skipping this cycle");
        }
        if let Err(err) = self.check_withdrawals(now, &mut changes).await {
            tracing::warn!(error = %err, "withdrawal check failed, skipping this cycle");
        }
        if let Err(err) = self.check_transaction_tails(now, &mut changes).await {
            tracing::warn!(error = %err, "transaction tail check failed, skipping this cycle");
        }

        self.cache.evict_stale(now);

        let mut stats = self.stats.write().await;
        stats.record_check(now);
        for change in changes {
            let event = ChangeEvent {
                seq: self.next_seq,
                detected_at: now,
                change,
            };
            self.next_seq += 1;
            stats.record_change(&event);
            tracing::debug!(seq = event.seq, kind = %event.change.kind(), "drift detected");
            self.events.publish(StreamEvent::Change(event));
            stats.record_broadcast();
        }
        let status = MonitorStatusEvent {
            emitted_at: now,
            stats: stats.snapshot(),
        };
        drop(stats);
        self.events.publish(StreamEvent::MonitorStatus(status));
    }

    /// Balances seen for the first time are cached silently; only a
    /// changed value is worth announcing.
    async fn check_balances(
        &mut self,
        now: OffsetDateTime,
        changes: &mut Vec<Change>,
    ) -> Result<(), crate::store::StoreError> {
        let rows = self
            .store
            .balances_with_recent_activity(self.config.recency_window)
            .await?;
        for row in rows {
            let id = EntityId::balance(row.user_id.clone());
            match self.cache.observe(id, ObservedValue::Balance(row.balance), now) {
                Observation::New | Observation::Unchanged => {}
                Observation::Drifted { previous } => changes.push(Change::Balance {
                    user_id: row.user_id,
                    previous: previous.as_balance(),
                    balance: row.balance,
                }),
            }
        }
        Ok(())
    }

    /// Deposits announce their first observation too: a deposit showing
    /// up inside the recency window is itself the news.
    async fn check_deposits(
        &mut self,
        now: OffsetDateTime,
        changes: &mut Vec<Change>,
    ) -> Result<(), crate::store::StoreError> {
        let rows = self
            .store
            .deposits_with_recent_activity(self.config.recency_window)
            .await?;
        for row in rows {
            let id = EntityId::deposit(row.deposit_id);
            let value = ObservedValue::Deposit {
                amount: row.amount,
                status: row.status,
            };
            match self.cache.observe(id, value, now) {
                Observation::Unchanged => {}
                Observation::New => changes.push(Change::Deposit {
                    deposit_id: row.deposit_id,
                    user_id: row.user_id,
                    amount: row.amount,
                    previous_status: None,
                    status: row.status,
                }),
                Observation::Drifted { previous } => changes.push(Change::Deposit {
                    deposit_id: row.deposit_id,
                    user_id: row.user_id,
                    amount: row.amount,
                    previous_status: previous.as_deposit_status(),
                    status: row.status,
                }),
            }
        }
        Ok(())
    }

    async fn check_withdrawals(
        &mut self,
        now: OffsetDateTime,
        changes: &mut Vec<Change>,
    ) -> Result<(), crate::store::StoreError> {
        let rows = self
            .store
            .withdrawals_with_recent_activity(self.config.recency_window)
            .await?;
        for row in rows {
            let id = EntityId::withdrawal(row.withdrawal_id);
            let value = ObservedValue::Withdrawal {
                amount: row.amount,
                status: row.status,
            };
            match self.cache.observe(id, value, now) {
                Observation::Unchanged => {}
                Observation::New => changes.push(Change::Withdrawal {
                    withdrawal_id: row.withdrawal_id,
                    user_id: row.user_id,
                    amount: row.amount,
                    previous_status: None,
                    status: row.status,
                }),
                Observation::Drifted { previous } => changes.push(Change::Withdrawal {
                    withdrawal_id: row.withdrawal_id,
                    user_id: row.user_id,
                    amount: row.amount,
                    previous_status: previous.as_withdrawal_status(),
                    status: row.status,
                }),
            }
        }
        Ok(())
    }

    /// A first-seen tail only establishes the baseline; announcing it
    /// would re-report the whole window as "new" transactions.
    async fn check_transaction_tails(
        &mut self,
        now: OffsetDateTime,
        changes: &mut Vec<Change>,
    ) -> Result<(), crate::store::StoreError> {
        let rows = self
            .store
            .transactions_with_recent_activity(self.config.recency_window)
            .await?;
        for tail in transactions::tails(rows) {
            let id = EntityId::transaction_tail(tail.user_id.clone());
            let value = ObservedValue::TransactionTail {
                latest_id: tail.latest_id,
            };
            match self.cache.observe(id, value, now) {
                Observation::New | Observation::Unchanged => {}
                Observation::Drifted { previous } => {
                    let previous_latest = previous.as_tail_latest_id().unwrap_or(0);
                    let new_count = tail.new_since(previous_latest);
                    if new_count > 0 {
                        changes.push(Change::TransactionBatch {
                            user_id: tail.user_id,
                            new_count,
                            latest_id: tail.latest_id,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Start the loop on the runtime and hand back its control surface.
    pub fn spawn(self) -> MonitorHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = self.stats_handle();
        let task = tokio::spawn(self.run(shutdown_rx));
        MonitorHandle {
            stats,
            shutdown_tx,
            task,
        }
    }
}

/// Control surface of a spawned reconciler.
pub struct MonitorHandle {
    stats: Arc<RwLock<MonitorStats>>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Signal shutdown and wait for the loop to finish. A cycle already
    /// in flight completes before the task exits.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }

    pub async fn stats(&self) -> StatsSnapshot {
        self.stats.read().await.snapshot()
    }

    pub async fn reset_stats(&self) {
        self.stats.write().await.reset();
    }

    pub fn stats_handle(&self) -> Arc<RwLock<MonitorStats>> {
        Arc::clone(&self.stats)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use compact_str::CompactString;
    use rust_decimal::Decimal;

    use super::*;
    use crate::entities::balances::BalanceActivity;
    use crate::entities::deposits::DepositActivity;
    use crate::entities::transactions::TransactionActivity;
    use crate::entities::withdrawals::WithdrawalActivity;
    use crate::entities::{DepositStatus, WithdrawalStatus};
    use crate::events::EventReceiver;
    use crate::store::StoreError;

    #[derive(Default)]
    struct MockStore {
        balances: Mutex<Vec<BalanceActivity>>,
        deposits: Mutex<Vec<DepositActivity>>,
        withdrawals: Mutex<Vec<WithdrawalActivity>>,
        transactions: Mutex<Vec<TransactionActivity>>,
        fail_balances: AtomicBool,
    }

    impl MockStore {
        fn set_balance(&self, user: &str, cents: i64) {
            let mut rows = self.balances.lock().unwrap();
            rows.retain(|row| row.user_id != user);
            rows.push(BalanceActivity {
                user_id: CompactString::from(user),
                balance: Decimal::new(cents, 2),
                updated_at: OffsetDateTime::now_utc(),
            });
        }

        fn set_deposit(&self, deposit_id: i64, user: &str, status: DepositStatus) {
            let mut rows = self.deposits.lock().unwrap();
            rows.retain(|row| row.deposit_id != deposit_id);
            rows.push(DepositActivity {
                deposit_id,
                user_id: CompactString::from(user),
                amount: Decimal::new(5000, 2),
                status,
                updated_at: OffsetDateTime::now_utc(),
            });
        }

        fn set_withdrawal(&self, withdrawal_id: i64, user: &str, status: WithdrawalStatus) {
            let mut rows = self.withdrawals.lock().unwrap();
            rows.retain(|row| row.withdrawal_id != withdrawal_id);
            rows.push(WithdrawalActivity {
                withdrawal_id,
                user_id: CompactString::from(user),
                amount: Decimal::new(2500, 2),
                status,
                updated_at: OffsetDateTime::now_utc(),
            });
        }

        fn add_transaction(&self, txn_id: i64, user: &str) {
            self.transactions.lock().unwrap().push(TransactionActivity {
                txn_id,
                user_id: CompactString::from(user),
                amount: Decimal::ONE,
                created_at: OffsetDateTime::now_utc(),
            });
        }
    }

    #[async_trait]
    impl StateStore for std::sync::Arc<MockStore> {
        async fn balances_with_recent_activity(
            &self,
            _window: time::Duration,
        ) -> Result<Vec<BalanceActivity>, StoreError> {
            if self.fail_balances.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("balances offline".into()));
            }
            Ok(self.balances.lock().unwrap().clone())
        }

        async fn deposits_with_recent_activity(
            &self,
            _window: time::Duration,
        ) -> Result<Vec<DepositActivity>, StoreError> {
            Ok(self.deposits.lock().unwrap().clone())
        }

        async fn withdrawals_with_recent_activity(
            &self,
            _window: time::Duration,
        ) -> Result<Vec<WithdrawalActivity>, StoreError> {
            Ok(self.withdrawals.lock().unwrap().clone())
        }

        async fn transactions_with_recent_activity(
            &self,
            _window: time::Duration,
        ) -> Result<Vec<TransactionActivity>, StoreError> {
            Ok(self.transactions.lock().unwrap().clone())
        }
    }

    fn setup() -> (std::sync::Arc<MockStore>, Reconciler<std::sync::Arc<MockStore>>, EventReceiver) {
        let store = std::sync::Arc::new(MockStore::default());
        let events = EventBroadcaster::new(64);
        let rx = events.subscribe();
        let reconciler = Reconciler::new(
            std::sync::Arc::clone(&store),
            events,
            ReconcilerConfig::default(),
        );
        (store, reconciler, rx)
    }

    /// Drain everything currently queued, splitting changes from status
    /// events.
    fn drain(rx: &mut EventReceiver) -> (Vec<ChangeEvent>, usize) {
        let mut changes = Vec::new();
        let mut status_count = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                StreamEvent::Change(change) => changes.push(change),
                StreamEvent::MonitorStatus(_) => status_count += 1,
            }
        }
        (changes, status_count)
    }

    #[tokio::test]
    async fn balance_drift_emits_event_with_previous_value() {
        let (store, mut reconciler, mut rx) = setup();
        store.set_balance("user-1", 10000);

        // first observation is silent
        reconciler.run_cycle().await;
        let (changes, status_count) = drain(&mut rx);
        assert!(changes.is_empty());
        assert_eq!(status_count, 1);

        store.set_balance("user-1", 8000);
        reconciler.run_cycle().await;
        let (changes, _) = drain(&mut rx);
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes[0].change,
            Change::Balance {
                user_id: "user-1".into(),
                previous: Some(Decimal::new(10000, 2)),
                balance: Decimal::new(8000, 2),
            }
        );
    }

    #[tokio::test]
    async fn unchanged_state_emits_no_change_events() {
        let (store, mut reconciler, mut rx) = setup();
        store.set_balance("user-1", 10000);
        store.set_deposit(1, "user-1", DepositStatus::Confirmed);

        reconciler.run_cycle().await;
        drain(&mut rx);

        for _ in 0..3 {
            reconciler.run_cycle().await;
        }
        let (changes, status_count) = drain(&mut rx);
        assert!(changes.is_empty());
        // liveness status still arrives every cycle
        assert_eq!(status_count, 3);
    }

    #[tokio::test]
    async fn deposits_announce_their_first_observation() {
        let (store, mut reconciler, mut rx) = setup();
        store.set_deposit(7, "user-1", DepositStatus::Pending);
        store.set_withdrawal(3, "user-2", WithdrawalStatus::Requested);

        reconciler.run_cycle().await;
        let (changes, _) = drain(&mut rx);
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().any(|event| matches!(
            &event.change,
            Change::Deposit {
                deposit_id: 7,
                previous_status: None,
                status: DepositStatus::Pending,
                ..
            }
        )));
        assert!(changes.iter().any(|event| matches!(
            &event.change,
            Change::Withdrawal {
                withdrawal_id: 3,
                previous_status: None,
                status: WithdrawalStatus::Requested,
                ..
            }
        )));

        store.set_deposit(7, "user-1", DepositStatus::Confirmed);
        reconciler.run_cycle().await;
        let (changes, _) = drain(&mut rx);
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes[0].change,
            Change::Deposit {
                previous_status: Some(DepositStatus::Pending),
                status: DepositStatus::Confirmed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn transaction_tail_growth_reports_only_new_entries() {
        let (store, mut reconciler, mut rx) = setup();
        store.add_transaction(1, "user-1");
        store.add_transaction(2, "user-1");

        // baseline established silently
        reconciler.run_cycle().await;
        let (changes, _) = drain(&mut rx);
        assert!(changes.is_empty());

        store.add_transaction(3, "user-1");
        store.add_transaction(4, "user-1");
        reconciler.run_cycle().await;
        let (changes, _) = drain(&mut rx);
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes[0].change,
            Change::TransactionBatch {
                user_id: "user-1".into(),
                new_count: 2,
                latest_id: 4,
            }
        );
    }

    #[tokio::test]
    async fn sequence_numbers_are_strictly_increasing_across_cycles() {
        let (store, mut reconciler, mut rx) = setup();
        store.set_balance("user-1", 100);
        store.set_balance("user-2", 100);
        reconciler.run_cycle().await;
        drain(&mut rx);

        let mut seen = Vec::new();
        for step in 1..=3 {
            store.set_balance("user-1", 100 + step);
            store.set_balance("user-2", 200 + step);
            reconciler.run_cycle().await;
            let (changes, _) = drain(&mut rx);
            seen.extend(changes.into_iter().map(|event| event.seq));
        }
        assert_eq!(seen.len(), 6);
        assert!(seen.windows(2).all(|pair| pair[1] > pair[0]));
        assert_eq!(seen[0], 1);
    }

    #[tokio::test]
    async fn failing_sub_check_does_not_block_the_others() {
        let (store, mut reconciler, mut rx) = setup();
        store.set_deposit(1, "user-1", DepositStatus::Pending);
        reconciler.run_cycle().await;
        drain(&mut rx);

        store.fail_balances.store(true, Ordering::SeqCst);
        store.set_deposit(1, "user-1", DepositStatus::Confirmed);
        reconciler.run_cycle().await;

        let (changes, status_count) = drain(&mut rx);
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes[0].change,
            Change::Deposit {
                status: DepositStatus::Confirmed,
                ..
            }
        ));
        assert_eq!(status_count, 1);

        // balance check recovers next cycle without a restart
        store.fail_balances.store(false, Ordering::SeqCst);
        store.set_balance("user-1", 500);
        reconciler.run_cycle().await;
        reconciler.run_cycle().await;
        let stats = reconciler.stats_handle();
        assert_eq!(stats.read().await.snapshot().checks_performed, 4);
    }

    #[tokio::test]
    async fn stats_track_checks_drifts_and_broadcasts() {
        let (store, mut reconciler, mut rx) = setup();
        let stats = reconciler.stats_handle();
        store.set_balance("user-1", 10000);
        reconciler.run_cycle().await;
        store.set_balance("user-1", 9000);
        reconciler.run_cycle().await;
        drain(&mut rx);

        let snap = stats.read().await.snapshot();
        assert_eq!(snap.checks_performed, 2);
        assert_eq!(snap.drifts_detected, 1);
        assert_eq!(snap.broadcasts_sent, 1);
        assert!(snap.last_check_at.is_some());
        assert_eq!(snap.recent_changes.len(), 1);
        assert_eq!(snap.recent_changes[0].kind, "balance");
        assert_eq!(snap.recent_changes[0].subject, "user-1");
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_monitor_polls_and_stops_cleanly() {
        let store = std::sync::Arc::new(MockStore::default());
        store.set_balance("user-1", 100);
        let events = EventBroadcaster::new(64);
        let reconciler = Reconciler::new(
            std::sync::Arc::clone(&store),
            events,
            ReconcilerConfig {
                poll_interval: std::time::Duration::from_millis(10),
                ..ReconcilerConfig::default()
            },
        );
        let handle = reconciler.spawn();

        tokio::time::sleep(std::time::Duration::from_millis(55)).await;
        let snap = handle.stats().await;
        assert!(snap.checks_performed >= 1);

        handle.reset_stats().await;
        assert_eq!(handle.stats().await.checks_performed, 0);

        handle.stop().await;
    }
}
