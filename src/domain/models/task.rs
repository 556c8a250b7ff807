use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of a storage task.
///
/// Negative states are terminal failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Unregistered,
    DownloadHeaderStarted,
    DownloadHeaderSucceeded,
    DownloadChildStarted,
    DownloadFullSucceeded,
    AwaitingProofSubmission,
    ProofSubmittedAwaitingAck,
    PeriodFinished,
    TaskFinished,
    DownloadHeaderFailed,
    DownloadChildFailed,
    ProviderSlotsExhausted,
}

/// Rejected state write
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid task transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: TaskState,
    pub to: TaskState,
}

/// Allowed state changes
const TRANSITIONS: &[(TaskState, TaskState)] = &[
    (TaskState::Unregistered, TaskState::DownloadHeaderStarted),
    (TaskState::Unregistered, TaskState::DownloadHeaderFailed),
    (TaskState::DownloadHeaderStarted, TaskState::DownloadHeaderSucceeded),
    (TaskState::DownloadHeaderStarted, TaskState::DownloadFullSucceeded),
    (TaskState::DownloadHeaderSucceeded, TaskState::DownloadChildStarted),
    (TaskState::DownloadHeaderSucceeded, TaskState::DownloadChildFailed),
    (TaskState::DownloadChildStarted, TaskState::DownloadFullSucceeded),
    (TaskState::DownloadFullSucceeded, TaskState::AwaitingProofSubmission),
    (TaskState::DownloadFullSucceeded, TaskState::ProviderSlotsExhausted),
    (TaskState::AwaitingProofSubmission, TaskState::ProofSubmittedAwaitingAck),
    (TaskState::AwaitingProofSubmission, TaskState::PeriodFinished),
    (TaskState::ProofSubmittedAwaitingAck, TaskState::AwaitingProofSubmission),
    (TaskState::PeriodFinished, TaskState::TaskFinished),
];

impl TaskState {
    pub const ALL: [TaskState; 12] = [
        TaskState::Unregistered,
        TaskState::DownloadHeaderStarted,
        TaskState::DownloadHeaderSucceeded,
        TaskState::DownloadChildStarted,
        TaskState::DownloadFullSucceeded,
        TaskState::AwaitingProofSubmission,
        TaskState::ProofSubmittedAwaitingAck,
        TaskState::PeriodFinished,
        TaskState::TaskFinished,
        TaskState::DownloadHeaderFailed,
        TaskState::DownloadChildFailed,
        TaskState::ProviderSlotsExhausted,
    ];

    /// Integer stored in the `task_state` column
    pub fn code(self) -> i32 {
        match self {
            TaskState::Unregistered => 0,
            TaskState::DownloadHeaderStarted => 1,
            TaskState::DownloadHeaderSucceeded => 2,
            TaskState::DownloadChildStarted => 3,
            TaskState::DownloadFullSucceeded => 4,
            TaskState::AwaitingProofSubmission => 5,
            TaskState::ProofSubmittedAwaitingAck => 6,
            TaskState::PeriodFinished => 7,
            TaskState::TaskFinished => 8,
            TaskState::DownloadHeaderFailed => -1,
            TaskState::DownloadChildFailed => -2,
            TaskState::ProviderSlotsExhausted => -3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            TaskState::Unregistered => "unregistered",
            TaskState::DownloadHeaderStarted => "download_header_started",
            TaskState::DownloadHeaderSucceeded => "download_header_succeeded",
            TaskState::DownloadChildStarted => "download_child_started",
            TaskState::DownloadFullSucceeded => "download_full_succeeded",
            TaskState::AwaitingProofSubmission => "awaiting_proof_submission",
            TaskState::ProofSubmittedAwaitingAck => "proof_submitted_awaiting_ack",
            TaskState::PeriodFinished => "period_finished",
            TaskState::TaskFinished => "task_finished",
            TaskState::DownloadHeaderFailed => "download_header_failed",
            TaskState::DownloadChildFailed => "download_child_failed",
            TaskState::ProviderSlotsExhausted => "provider_slots_exhausted",
        }
    }

    pub fn is_terminal(self) -> bool {
        !TRANSITIONS.iter().any(|(from, _)| *from == self)
    }

    pub fn can_transition_to(self, next: TaskState) -> bool {
        TRANSITIONS.contains(&(self, next))
    }

    pub fn transition(self, next: TaskState) -> Result<TaskState, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One provider task per order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub order_id: i64,
    /// Blank until registration is confirmed
    pub provider_address: String,
    pub state: TaskState,
    pub last_proof_time: i64,
    pub next_proof_time: i64,
    pub header_retries: i32,
    pub child_retries: i32,
    pub claimed_rewards: i64,
}

/// Values for a task created by the generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub order_id: i64,
    pub provider_address: String,
    pub state: TaskState,
    pub last_proof_time: i64,
    pub next_proof_time: i64,
}

impl NewTask {
    pub fn unregistered(order_id: i64) -> Self {
        Self {
            order_id,
            provider_address: String::new(),
            state: TaskState::Unregistered,
            last_proof_time: 0,
            next_proof_time: 0,
        }
    }

    /// Task for an order this provider already serves
    pub fn registered(
        order_id: i64,
        provider_address: String,
        last_proof_time: i64,
        proof_span: i64,
    ) -> Self {
        Self {
            order_id,
            provider_address,
            state: TaskState::AwaitingProofSubmission,
            last_proof_time,
            next_proof_time: last_proof_time + proof_span,
        }
    }
}

/// Column changes for one task row.
///
/// The state can only be set through [`TaskUpdate::transition`], so every
/// state write is checked against the transition graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    state: Option<TaskState>,
    pub provider_address: Option<String>,
    pub last_proof_time: Option<i64>,
    pub next_proof_time: Option<i64>,
    pub header_retries: Option<i32>,
    pub child_retries: Option<i32>,
    pub claimed_rewards: Option<i64>,
}

impl TaskUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transition(from: TaskState, to: TaskState) -> Result<Self, InvalidTransition> {
        Ok(Self {
            state: Some(from.transition(to)?),
            ..Self::default()
        })
    }

    pub fn state(&self) -> Option<TaskState> {
        self.state
    }

    pub fn provider_address(mut self, address: impl Into<String>) -> Self {
        self.provider_address = Some(address.into());
        self
    }

    /// Record the last confirmed proof and derive the next due time
    pub fn proof_times(mut self, last_proof_time: i64, proof_span: i64) -> Self {
        self.last_proof_time = Some(last_proof_time);
        self.next_proof_time = Some(last_proof_time + proof_span);
        self
    }

    pub fn header_retries(mut self, retries: i32) -> Self {
        self.header_retries = Some(retries);
        self
    }

    pub fn child_retries(mut self, retries: i32) -> Self {
        self.child_retries = Some(retries);
        self
    }

    pub fn claimed_rewards(mut self, amount: i64) -> Self {
        self.claimed_rewards = Some(amount);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_update_builder() {
        let update = TaskUpdate::transition(
            TaskState::DownloadFullSucceeded,
            TaskState::AwaitingProofSubmission,
        )
        .unwrap()
        .provider_address("EQprovider")
        .proof_times(100, 50);
        assert_eq!(update.state(), Some(TaskState::AwaitingProofSubmission));
        assert_eq!(update.next_proof_time, Some(150));

        assert!(TaskUpdate::transition(TaskState::TaskFinished, TaskState::Unregistered).is_err());
        assert!(TaskUpdate::new().is_empty());
        assert!(!TaskUpdate::new().header_retries(1).is_empty());
    }

    #[test]
    fn test_codes_round_trip() {
        for state in TaskState::ALL {
            assert_eq!(TaskState::from_code(state.code()), Some(state));
        }
        assert_eq!(TaskState::from_code(9), None);
        assert_eq!(TaskState::from_code(-4), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskState::TaskFinished.is_terminal());
        assert!(TaskState::DownloadHeaderFailed.is_terminal());
        assert!(TaskState::DownloadChildFailed.is_terminal());
        assert!(TaskState::ProviderSlotsExhausted.is_terminal());
        assert!(!TaskState::PeriodFinished.is_terminal());
    }

    #[test]
    fn test_rejected_transition() {
        let err = TaskState::Unregistered
            .transition(TaskState::AwaitingProofSubmission)
            .unwrap_err();
        assert_eq!(err.from, TaskState::Unregistered);
        assert_eq!(
            err.to_string(),
            "invalid task transition unregistered -> awaiting_proof_submission"
        );
    }

    #[test]
    fn test_registered_task_schedule() {
        let task = NewTask::registered(3, "EQ...".to_string(), 1_000, 3_600);
        assert_eq!(task.state, TaskState::AwaitingProofSubmission);
        assert_eq!(task.next_proof_time, 4_600);
    }

    fn any_state() -> impl Strategy<Value = TaskState> {
        (0..TaskState::ALL.len()).prop_map(|i| TaskState::ALL[i])
    }

    proptest! {
        #[test]
        fn prop_only_ack_moves_backwards(moves in proptest::collection::vec(any_state(), 1..64)) {
            let mut current = TaskState::Unregistered;
            for next in moves {
                match current.transition(next) {
                    Ok(state) => {
                        prop_assert!(!current.is_terminal());
                        if state.code() >= 0 && state.code() < current.code() {
                            prop_assert_eq!(current, TaskState::ProofSubmittedAwaitingAck);
                            prop_assert_eq!(state, TaskState::AwaitingProofSubmission);
                        }
                        current = state;
                    }
                    Err(err) => {
                        prop_assert_eq!(err.from, current);
                        prop_assert!(!current.can_transition_to(next));
                    }
                }
            }
        }
    }
}
