//! Optimistic mutation client.
//!
//! Applies a locally-constructed tentative result for a bet immediately,
//! then reconciles with the authoritative response: on success the
//! temporary entry is spliced out and replaced (never merged, so no
//! duplicates), on failure every touched state slice is restored verbatim
//! from a snapshot captured before the tentative apply.
//!
//! Each mutation owns its snapshot copies, so concurrent mutations on
//! different subjects can never clobber each other's rollback data. The
//! shared [`LocalState`] lock is held only across the synchronous apply and
//! settle steps, never across the network round trip.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use compact_str::CompactString;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::objects::{BetResponse, BetSelection, PlaceBetRequest};

/// Identity of a bet in the local view.
///
/// Temporary ids are client-generated and rendered with a `tmp-` prefix so
/// they can never collide with (or be mistaken for) durable server ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BetId {
    Temporary(Uuid),
    Confirmed(i64),
}

impl BetId {
    pub fn is_temporary(&self) -> bool {
        matches!(self, BetId::Temporary(_))
    }
}

impl std::fmt::Display for BetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BetId::Temporary(token) => write!(f, "tmp-{token}"),
            BetId::Confirmed(id) => write!(f, "{id}"),
        }
    }
}

/// One bet as the local view knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetView {
    pub id: BetId,
    pub round_id: i64,
    pub selection: BetSelection,
    pub amount: Decimal,
    /// `None` while the bet is tentative; set from the server response.
    pub placed_at: Option<time::OffsetDateTime>,
}

impl BetView {
    fn confirmed(response: &BetResponse) -> Self {
        Self {
            id: BetId::Confirmed(response.bet_id),
            round_id: response.round_id,
            selection: response.selection,
            amount: response.amount,
            placed_at: Some(response.placed_at),
        }
    }
}

/// Client-local view of the state slices a bet mutation touches.
///
/// Slices are keyed per user so mutations for different subjects touch
/// disjoint entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalState {
    balances: HashMap<CompactString, Decimal>,
    bets: HashMap<CompactString, Vec<BetView>>,
}

impl LocalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&mut self, user_id: impl Into<CompactString>, balance: Decimal) {
        self.balances.insert(user_id.into(), balance);
    }

    pub fn balance(&self, user_id: &str) -> Option<Decimal> {
        self.balances.get(user_id).copied()
    }

    pub fn bets(&self, user_id: &str) -> &[BetView] {
        self.bets.get(user_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Copy the slices a mutation for `user_id` will touch.
    fn snapshot_for(&self, user_id: &CompactString) -> StateSnapshot {
        StateSnapshot {
            user_id: user_id.clone(),
            balance: self.balances.get(user_id).copied(),
            bets: self.bets.get(user_id).cloned(),
        }
    }

    fn apply_tentative(&mut self, user_id: &CompactString, view: BetView) {
        if let Some(balance) = self.balances.get_mut(user_id) {
            *balance -= view.amount;
        }
        self.bets.entry(user_id.clone()).or_default().push(view);
    }

    /// Replace the temporary entry with the authoritative result.
    ///
    /// The temporary entry is filtered out by token rather than merged,
    /// so a success can never leave both entries behind.
    fn splice_confirmed(&mut self, user_id: &CompactString, token: Uuid, response: &BetResponse) {
        let entries = self.bets.entry(user_id.clone()).or_default();
        entries.retain(|bet| bet.id != BetId::Temporary(token));
        entries.push(BetView::confirmed(response));
        self.balances
            .insert(user_id.clone(), response.balance_after);
    }

    /// Restore the snapshotted slices verbatim. Slices the snapshot does
    /// not cover are left untouched.
    fn restore(&mut self, snapshot: &StateSnapshot) {
        match snapshot.balance {
            Some(balance) => {
                self.balances.insert(snapshot.user_id.clone(), balance);
            }
            None => {
                self.balances.remove(&snapshot.user_id);
            }
        }
        match &snapshot.bets {
            Some(bets) => {
                self.bets.insert(snapshot.user_id.clone(), bets.clone());
            }
            None => {
                self.bets.remove(&snapshot.user_id);
            }
        }
    }
}

/// Owned pre-mutation copies of every slice one mutation touched.
///
/// `None` means the slice did not exist before the mutation and must be
/// removed again on rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    user_id: CompactString,
    balance: Option<Decimal>,
    bets: Option<Vec<BetView>>,
}

/// Lifecycle of one optimistic mutation. Terminal states are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    Pending,
    Committed,
    RolledBack,
}

/// A pending local operation: its token, the tentative result, and the
/// rollback snapshot. Owned by the submission that created it.
#[derive(Debug)]
pub struct OptimisticMutation {
    token: Uuid,
    tentative: BetView,
    snapshot: StateSnapshot,
    status: MutationStatus,
}

impl OptimisticMutation {
    fn new(token: Uuid, tentative: BetView, snapshot: StateSnapshot) -> Self {
        Self {
            token,
            tentative,
            snapshot,
            status: MutationStatus::Pending,
        }
    }

    pub fn token(&self) -> Uuid {
        self.token
    }

    pub fn tentative(&self) -> &BetView {
        &self.tentative
    }

    pub fn status(&self) -> MutationStatus {
        self.status
    }

    /// Transition to committed. Only valid from pending.
    fn commit(&mut self) {
        if self.status == MutationStatus::Pending {
            self.status = MutationStatus::Committed;
        }
    }

    /// Transition to rolled-back. Only valid from pending.
    fn roll_back(&mut self) {
        if self.status == MutationStatus::Pending {
            self.status = MutationStatus::RolledBack;
        }
    }
}

/// Why a mutation did not commit.
///
/// The two variants deliberately read differently: a rejection means the
/// server decided against the bet, a transport failure means the outcome
/// was never confirmed and retrying is reasonable.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum MutationError {
    /// The write API rejected the mutation (business rule, e.g.
    /// insufficient balance). The message is the server's, verbatim.
    #[error("bet rejected: {message}")]
    Rejected { message: String },

    /// The request failed before a definitive answer arrived (timeout,
    /// connection error).
    #[error("bet not confirmed ({message}); check your connection and try again")]
    Transport { message: String },
}

impl MutationError {
    pub fn is_business_rule(&self) -> bool {
        matches!(self, MutationError::Rejected { .. })
    }
}

/// The write API the optimistic client submits through.
///
/// Implemented by the SDK HTTP client (feature `client`) and by test
/// doubles.
#[async_trait]
pub trait BetWriteApi: Send + Sync {
    async fn place_bet(&self, request: &PlaceBetRequest) -> Result<BetResponse, MutationError>;
}

/// Result of a batch submission. Each bet is an independent mutation; a
/// failure partway through never hides which bets succeeded.
#[derive(Debug)]
pub struct BatchOutcome {
    pub outcomes: Vec<(PlaceBetRequest, Result<BetResponse, MutationError>)>,
}

impl BatchOutcome {
    pub fn fully_committed(&self) -> bool {
        self.outcomes.iter().all(|(_, result)| result.is_ok())
    }

    pub fn committed(&self) -> impl Iterator<Item = &BetResponse> {
        self.outcomes
            .iter()
            .filter_map(|(_, result)| result.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&PlaceBetRequest, &MutationError)> {
        self.outcomes
            .iter()
            .filter_map(|(request, result)| result.as_ref().err().map(|err| (request, err)))
    }
}

/// Drives optimistic bet mutations against a shared [`LocalState`].
pub struct OptimisticBetClient<A> {
    api: A,
    state: Arc<Mutex<LocalState>>,
}

impl<A: BetWriteApi> OptimisticBetClient<A> {
    pub fn new(api: A) -> Self {
        Self::with_state(api, Arc::new(Mutex::new(LocalState::new())))
    }

    /// Attach to an existing shared local state.
    pub fn with_state(api: A, state: Arc<Mutex<LocalState>>) -> Self {
        Self { api, state }
    }

    pub fn state(&self) -> Arc<Mutex<LocalState>> {
        self.state.clone()
    }

    /// Submit one bet optimistically.
    ///
    /// The tentative result (temporary id, implied balance decrease) is
    /// visible in the local state for the whole server round trip. On
    /// success the temporary entry is replaced by the authoritative one;
    /// on failure the snapshotted slices are restored and the error says
    /// whether the server rejected the bet or the request never resolved.
    pub async fn submit(&self, request: PlaceBetRequest) -> Result<BetResponse, MutationError> {
        let token = Uuid::new_v4();
        let tentative = BetView {
            id: BetId::Temporary(token),
            round_id: request.round_id,
            selection: request.selection,
            amount: request.amount,
            placed_at: None,
        };

        let mut mutation = {
            let mut state = self.state.lock().await;
            let snapshot = state.snapshot_for(&request.user_id);
            state.apply_tentative(&request.user_id, tentative.clone());
            OptimisticMutation::new(token, tentative, snapshot)
        };

        match self.api.place_bet(&request).await {
            Ok(response) => {
                let mut state = self.state.lock().await;
                state.splice_confirmed(&request.user_id, token, &response);
                mutation.commit();
                Ok(response)
            }
            Err(err) => {
                let mut state = self.state.lock().await;
                state.restore(&mutation.snapshot);
                mutation.roll_back();
                Err(err)
            }
        }
    }

    /// Submit several bets from one user action.
    ///
    /// There is no atomicity across the batch: every bet commits or rolls
    /// back on its own, and the returned outcome lists each result so
    /// partial success is always explicit.
    pub async fn submit_batch(&self, requests: Vec<PlaceBetRequest>) -> BatchOutcome {
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            let result = self.submit(request.clone()).await;
            outcomes.push((request, result));
        }
        BatchOutcome { outcomes }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::objects::BetColor;
    use std::sync::atomic::{AtomicI64, Ordering};
    use time::macros::datetime;
    use tokio::sync::Semaphore;

    fn request(user: &str, amount: Decimal) -> PlaceBetRequest {
        PlaceBetRequest {
            user_id: user.into(),
            round_id: 1,
            selection: BetSelection::Color {
                color: BetColor::Green,
            },
            amount,
        }
    }

    /// Write API double that accepts or rejects per user. When a gate is
    /// set, each call parks until a permit is released.
    struct ScriptedApi {
        reject_users: Vec<CompactString>,
        transport_fail: bool,
        next_bet_id: AtomicI64,
        gate: Option<Arc<Semaphore>>,
    }

    impl ScriptedApi {
        fn accepting() -> Self {
            Self {
                reject_users: Vec::new(),
                transport_fail: false,
                next_bet_id: AtomicI64::new(100),
                gate: None,
            }
        }

        fn rejecting(users: &[&str]) -> Self {
            Self {
                reject_users: users.iter().map(|u| CompactString::from(*u)).collect(),
                ..Self::accepting()
            }
        }

        fn failing_transport() -> Self {
            Self {
                transport_fail: true,
                ..Self::accepting()
            }
        }
    }

    #[async_trait]
    impl BetWriteApi for ScriptedApi {
        async fn place_bet(
            &self,
            request: &PlaceBetRequest,
        ) -> Result<BetResponse, MutationError> {
            if let Some(gate) = &self.gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
            if self.transport_fail {
                return Err(MutationError::Transport {
                    message: "connection reset".into(),
                });
            }
            if self.reject_users.contains(&request.user_id) {
                return Err(MutationError::Rejected {
                    message: "insufficient balance".into(),
                });
            }
            Ok(BetResponse {
                bet_id: self.next_bet_id.fetch_add(1, Ordering::SeqCst),
                user_id: request.user_id.clone(),
                round_id: request.round_id,
                selection: request.selection,
                amount: request.amount,
                balance_after: Decimal::new(50000, 2),
                placed_at: datetime!(2026-01-02 03:04:05 UTC),
            })
        }
    }

    async fn seeded_client(api: ScriptedApi, user: &str, balance: Decimal) -> OptimisticBetClient<ScriptedApi> {
        let client = OptimisticBetClient::new(api);
        client.state().lock().await.set_balance(user, balance);
        client
    }

    #[tokio::test]
    async fn commit_replaces_temporary_entry_without_duplicates() {
        let client =
            seeded_client(ScriptedApi::accepting(), "user-1", Decimal::new(100000, 2)).await;

        let response = client
            .submit(request("user-1", Decimal::new(50000, 2)))
            .await
            .unwrap();

        let state = client.state();
        let state = state.lock().await;
        let bets = state.bets("user-1");
        assert_eq!(bets.len(), 1);
        assert_eq!(bets[0].id, BetId::Confirmed(response.bet_id));
        assert!(!bets[0].id.is_temporary());
        // authoritative balance, not the locally implied one
        assert_eq!(state.balance("user-1"), Some(response.balance_after));
    }

    #[tokio::test]
    async fn rejected_bet_restores_state_exactly() {
        let client = seeded_client(
            ScriptedApi::rejecting(&["user-1"]),
            "user-1",
            Decimal::new(100000, 2),
        )
        .await;
        let before = client.state().lock().await.clone();

        let err = client
            .submit(request("user-1", Decimal::new(50000, 2)))
            .await
            .unwrap_err();

        assert!(err.is_business_rule());
        assert_eq!(
            err,
            MutationError::Rejected {
                message: "insufficient balance".into()
            }
        );
        let after = client.state().lock().await.clone();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn insufficient_balance_scenario() {
        // balance 1000, bet 500, server rejects: tentative shows 500,
        // rollback restores 1000.
        let client = seeded_client(
            ScriptedApi::rejecting(&["user-1"]),
            "user-1",
            Decimal::new(1000, 0),
        )
        .await;

        let err = client
            .submit(request("user-1", Decimal::new(500, 0)))
            .await
            .unwrap_err();

        assert!(err.is_business_rule());
        let state = client.state();
        let state = state.lock().await;
        assert_eq!(state.balance("user-1"), Some(Decimal::new(1000, 0)));
        assert!(state.bets("user-1").is_empty());
    }

    #[tokio::test]
    async fn transport_failure_rolls_back_with_distinct_error() {
        let client = seeded_client(
            ScriptedApi::failing_transport(),
            "user-1",
            Decimal::new(1000, 0),
        )
        .await;
        let before = client.state().lock().await.clone();

        let err = client
            .submit(request("user-1", Decimal::new(100, 0)))
            .await
            .unwrap_err();

        assert!(!err.is_business_rule());
        assert_eq!(*client.state().lock().await, before);
    }

    #[tokio::test]
    async fn tentative_result_is_visible_during_the_round_trip() {
        let gate = Arc::new(Semaphore::new(0));
        let api = ScriptedApi {
            gate: Some(gate.clone()),
            ..ScriptedApi::accepting()
        };
        let client = Arc::new(seeded_client(api, "user-1", Decimal::new(1000, 0)).await);

        let submitting = {
            let client = client.clone();
            tokio::spawn(async move { client.submit(request("user-1", Decimal::new(300, 0))).await })
        };
        // Let the submission reach the gated write API call.
        tokio::task::yield_now().await;

        {
            let state = client.state();
            let state = state.lock().await;
            assert_eq!(state.balance("user-1"), Some(Decimal::new(700, 0)));
            let bets = state.bets("user-1");
            assert_eq!(bets.len(), 1);
            assert!(bets[0].id.is_temporary());
            assert!(bets[0].placed_at.is_none());
        }

        gate.add_permits(1);
        submitting.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn rollback_never_touches_other_subjects() {
        let gate = Arc::new(Semaphore::new(0));
        let api = ScriptedApi {
            gate: Some(gate.clone()),
            ..ScriptedApi::rejecting(&["user-2"])
        };
        let client = Arc::new(OptimisticBetClient::new(api));
        {
            let state = client.state();
            let mut state = state.lock().await;
            state.set_balance("user-1", Decimal::new(1000, 0));
            state.set_balance("user-2", Decimal::new(1000, 0));
        }

        // Two concurrent mutations, different subjects; user-2's is rejected.
        let first = {
            let client = client.clone();
            tokio::spawn(async move { client.submit(request("user-1", Decimal::new(200, 0))).await })
        };
        let second = {
            let client = client.clone();
            tokio::spawn(async move { client.submit(request("user-2", Decimal::new(900, 0))).await })
        };
        tokio::task::yield_now().await;
        gate.add_permits(2);

        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap_err();

        let state = client.state();
        let state = state.lock().await;
        // user-2 rolled back to its own snapshot
        assert_eq!(state.balance("user-2"), Some(Decimal::new(1000, 0)));
        assert!(state.bets("user-2").is_empty());
        // user-1 committed and was not clobbered by the rollback
        assert_eq!(state.bets("user-1").len(), 1);
        assert!(!state.bets("user-1")[0].id.is_temporary());
    }

    #[tokio::test]
    async fn batch_surfaces_partial_success() {
        let client = seeded_client(
            ScriptedApi::rejecting(&["user-2"]),
            "user-1",
            Decimal::new(1000, 0),
        )
        .await;
        client
            .state()
            .lock()
            .await
            .set_balance("user-2", Decimal::new(1000, 0));

        let outcome = client
            .submit_batch(vec![
                request("user-1", Decimal::new(100, 0)),
                request("user-2", Decimal::new(100, 0)),
            ])
            .await;

        assert!(!outcome.fully_committed());
        assert_eq!(outcome.committed().count(), 1);
        let failed: Vec<_> = outcome.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0.user_id, "user-2");
    }

    #[test]
    fn mutation_status_is_terminal() {
        let snapshot = StateSnapshot {
            user_id: "user-1".into(),
            balance: None,
            bets: None,
        };
        let tentative = BetView {
            id: BetId::Temporary(Uuid::nil()),
            round_id: 1,
            selection: BetSelection::Number { number: 5 },
            amount: Decimal::ONE,
            placed_at: None,
        };
        let mut mutation = OptimisticMutation::new(Uuid::nil(), tentative, snapshot);
        assert_eq!(mutation.status(), MutationStatus::Pending);
        mutation.commit();
        assert_eq!(mutation.status(), MutationStatus::Committed);
        mutation.roll_back();
        assert_eq!(mutation.status(), MutationStatus::Committed);
    }

    #[test]
    fn temporary_ids_are_prefixed() {
        let id = BetId::Temporary(Uuid::nil());
        assert!(id.to_string().starts_with("tmp-"));
        assert_eq!(BetId::Confirmed(42).to_string(), "42");
    }
}
