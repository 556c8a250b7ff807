#![allow(dead_code)]

use async_trait::async_trait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tonbag_provider::config::AppConfig;
use tonbag_provider::domain::cell::Address;
use tonbag_provider::domain::contract::{
    OrderInfo, ProofValue, ProviderEntry, ProviderRegistry, RewardsParams, StorageContractState,
};
use tonbag_provider::domain::models::{NewTask, OrderDetails};
use tonbag_provider::infrastructure::persistence::repositories::{OrderRepository, TaskRepository};
use tonbag_provider::infrastructure::persistence::{DbPool, Repositories, RepositoryFactory};
use tonbag_provider::infrastructure::proof::{ProofError, ProofGenerator};
use tonbag_provider::infrastructure::storage_daemon::{
    AddBagRequest, BagDetails, DaemonError, StorageDaemon,
};
use tonbag_provider::infrastructure::ton::{
    AccountState, ChainError, ChainProvider, StackEntry, StorageContract, TransactionLookup,
};
use tonbag_provider::utils::FixedClock;

pub const NOW: i64 = 1_700_000_000;
pub const PROOF_SPAN: i64 = 3_600;

/// In-memory database with migrations applied
pub async fn setup_db() -> (DatabaseConnection, Repositories) {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let conn = Database::connect(options).await.unwrap();

    let pool = DbPool::from_connection(conn.clone());
    pool.run_migrations().await.unwrap();
    let repositories = RepositoryFactory::create_repositories(&pool);
    (conn, repositories)
}

/// Configuration with every pause set to zero
pub fn test_config() -> AppConfig {
    let values: HashMap<&str, &str> = [
        ("TASK_REGISTER_CHECK_INTERVAL_MS", "0"),
        ("TASK_ACK_INTERVAL_MS", "0"),
        ("TASK_CLAIM_INTERVAL_MS", "0"),
        ("POLL_INDEXER_INTERVAL_MS", "0"),
        ("POLL_INDEXER_WALK_DELAY_MS", "0"),
        ("POLL_IDLE_MS", "0"),
        ("POLL_BATCH_INTERVAL_MS", "0"),
        ("STORAGE_DOWNLOAD_PATH", "/nonexistent/downloads"),
    ]
    .into_iter()
    .collect();
    AppConfig::from_lookup(|key| values.get(key).map(|value| value.to_string()))
}

pub fn address(seed: u8) -> Address {
    Address::new(0, [seed; 32])
}

pub fn provider_address() -> Address {
    address(0xAA)
}

/// Contract state of a running order
pub fn order_state(max_providers: u16, started: bool, period_finish: u32) -> StorageContractState {
    StorageContractState {
        order: OrderInfo {
            torrent_hash: [0x11; 32],
            file_merkle_hash: [0x22; 32],
            file_size: 1_000_000,
            storage_period: 86_400 * 30,
            max_storage_proof_span: PROOF_SPAN as u64,
            max_storage_providers: max_providers,
            owner: Some(address(0x01)),
            treasury: Some(address(0x02)),
            treasury_fee_rate: 100,
        },
        rewards: RewardsParams {
            started,
            total_rewards: 5_000_000_000,
            undistributed_rewards: 5_000_000_000,
            period_finish,
            last_update_time: 0,
        },
        registry: ProviderRegistry::default(),
    }
}

pub fn register(
    state: &mut StorageContractState,
    provider: &Address,
    last_proof_time: u32,
    next_proof: i64,
) {
    state
        .registry
        .insert(
            provider,
            ProviderEntry {
                registered_at: last_proof_time,
                last_proof_time: Some(last_proof_time),
                last_proof_valid: Some(true),
                next_proof,
            },
        )
        .unwrap();
}

/// Insert an order row for a contract state
pub async fn insert_order(
    conn: &DatabaseConnection,
    contract: &str,
    state: &StorageContractState,
) -> i64 {
    let details = OrderDetails::from_contract(state).unwrap();
    OrderRepository::insert_with(conn, contract, &details).await.unwrap()
}

pub async fn insert_task(conn: &DatabaseConnection, task: NewTask) -> i64 {
    TaskRepository::insert_with(conn, &task).await.unwrap()
}

/// Chain provider serving a fixed account and transaction set
#[derive(Debug, Default)]
pub struct FakeChain {
    pub account: Mutex<Option<AccountState>>,
    pub transactions: Mutex<HashMap<u64, TransactionLookup>>,
    pub lookups: AtomicUsize,
}

impl FakeChain {
    pub fn new(account: AccountState) -> Self {
        Self {
            account: Mutex::new(Some(account)),
            ..Self::default()
        }
    }

    pub fn add(&self, lt: u64, lookup: TransactionLookup) {
        self.transactions.lock().unwrap().insert(lt, lookup);
    }
}

#[async_trait]
impl ChainProvider for FakeChain {
    fn provider_name(&self) -> String {
        "fake".to_string()
    }

    async fn get_account_state(&self, _address: &str) -> Result<AccountState, ChainError> {
        self.account
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ChainError::Network("unreachable".to_string()))
    }

    async fn get_transaction(&self, _address: &str, lt: u64, _hash: &str) -> TransactionLookup {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.transactions
            .lock()
            .unwrap()
            .get(&lt)
            .cloned()
            .unwrap_or(TransactionLookup::Expired)
    }

    async fn run_get_method(
        &self,
        _address: &str,
        method: &str,
        _stack: Vec<StackEntry>,
    ) -> Result<Vec<StackEntry>, ChainError> {
        Err(ChainError::GetMethod {
            method: method.to_string(),
            exit_code: 11,
        })
    }
}

/// Storage contract proxy over in-memory contract states
#[derive(Debug)]
pub struct FakeContract {
    pub provider: Address,
    pub states: Mutex<HashMap<String, StorageContractState>>,
    /// Addresses whose state lookup fails
    pub failing: Mutex<Vec<String>>,
    pub balance: Mutex<Option<u128>>,
    /// Successive `earned` answers; the last one repeats
    pub earned: Mutex<VecDeque<u128>>,
    /// Registry entry written when a registration is sent
    pub registration_result: Mutex<Option<ProviderEntry>>,
    /// Last proof time written on the next state read after a proof
    pub proof_ack_time: Mutex<Option<u32>>,
    pub state_reads: AtomicUsize,
    pub registrations: AtomicUsize,
    pub submitted: Mutex<Vec<(String, Vec<ProofValue>)>>,
    pub claims: AtomicUsize,
}

impl FakeContract {
    pub fn new() -> Self {
        Self {
            provider: provider_address(),
            states: Mutex::new(HashMap::new()),
            failing: Mutex::new(Vec::new()),
            balance: Mutex::new(Some(10_000_000_000)),
            earned: Mutex::new(VecDeque::new()),
            registration_result: Mutex::new(None),
            proof_ack_time: Mutex::new(None),
            state_reads: AtomicUsize::new(0),
            registrations: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
            claims: AtomicUsize::new(0),
        }
    }

    pub fn set_state(&self, contract: &str, state: StorageContractState) {
        self.states
            .lock()
            .unwrap()
            .insert(contract.to_string(), state);
    }

    pub fn state(&self, contract: &str) -> Option<StorageContractState> {
        self.states.lock().unwrap().get(contract).cloned()
    }
}

#[async_trait]
impl StorageContract for FakeContract {
    fn provider_address(&self) -> Address {
        self.provider
    }

    async fn order_state(&self, address: &str) -> Result<Option<StorageContractState>, ChainError> {
        self.state_reads.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().iter().any(|failing| failing == address) {
            return Err(ChainError::Network("timeout".to_string()));
        }

        let ack_time = *self.proof_ack_time.lock().unwrap();
        let mut states = self.states.lock().unwrap();
        if let (Some(time), Some(state)) = (ack_time, states.get_mut(address)) {
            if let Ok(Some(mut entry)) = state.registry.entry(&self.provider) {
                entry.last_proof_time = Some(time);
                state.registry.insert(&self.provider, entry).unwrap();
            }
        }
        Ok(states.get(address).cloned())
    }

    async fn earned(&self, _address: &str) -> Result<u128, ChainError> {
        let mut earned = self.earned.lock().unwrap();
        if earned.len() > 1 {
            Ok(earned.pop_front().unwrap_or(0))
        } else {
            Ok(earned.front().copied().unwrap_or(0))
        }
    }

    async fn register(&self, address: &str) -> Result<(), ChainError> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        if let Some(entry) = *self.registration_result.lock().unwrap() {
            if let Some(state) = self.states.lock().unwrap().get_mut(address) {
                state.registry.insert(&self.provider, entry).unwrap();
            }
        }
        Ok(())
    }

    async fn submit_proof(&self, address: &str, proofs: &[ProofValue]) -> Result<(), ChainError> {
        self.submitted
            .lock()
            .unwrap()
            .push((address.to_string(), proofs.to_vec()));
        Ok(())
    }

    async fn claim_rewards(&self, _address: &str) -> Result<(), ChainError> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn provider_balance(&self) -> Result<Option<u128>, ChainError> {
        Ok(*self.balance.lock().unwrap())
    }
}

/// Storage daemon with scripted bag details
#[derive(Debug, Default)]
pub struct FakeDaemon {
    pub details: Mutex<HashMap<String, BagDetails>>,
    pub fail_add: AtomicBool,
    pub requests: Mutex<Vec<AddBagRequest>>,
}

impl FakeDaemon {
    pub fn set_details(&self, details: BagDetails) {
        self.details
            .lock()
            .unwrap()
            .insert(details.bag_id.clone(), details);
    }
}

#[async_trait]
impl StorageDaemon for FakeDaemon {
    async fn bag_details(&self, bag_id: &str) -> Result<Option<BagDetails>, DaemonError> {
        Ok(self.details.lock().unwrap().get(bag_id).cloned())
    }

    async fn add_bag(&self, request: &AddBagRequest) -> Result<(), DaemonError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_add.load(Ordering::SeqCst) {
            return Err(DaemonError::Network("connection refused".to_string()));
        }
        Ok(())
    }
}

/// Proof generator counting its calls
#[derive(Debug, Default)]
pub struct FakeProofs {
    pub calls: AtomicUsize,
}

#[async_trait]
impl ProofGenerator for FakeProofs {
    async fn proofs(&self, _bag_id: &str, _piece: u64) -> Result<Vec<ProofValue>, ProofError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![[0x01; 32], [0x02; 32], [0x03; 32], [0x04; 32]])
    }
}

/// Fakes plus a task context over them
pub struct Harness {
    pub conn: DatabaseConnection,
    pub repositories: Repositories,
    pub config: AppConfig,
    pub contract: Arc<FakeContract>,
    pub daemon: Arc<FakeDaemon>,
    pub proofs: Arc<FakeProofs>,
    pub clock: Arc<FixedClock>,
}

impl Harness {
    pub async fn new() -> Self {
        let (conn, repositories) = setup_db().await;
        Self {
            conn,
            repositories,
            config: test_config(),
            contract: Arc::new(FakeContract::new()),
            daemon: Arc::new(FakeDaemon::default()),
            proofs: Arc::new(FakeProofs::default()),
            clock: Arc::new(FixedClock::new(NOW)),
        }
    }

    pub fn context(&self) -> tonbag_provider::application::tasks::TaskContext {
        tonbag_provider::application::tasks::TaskContext::new(
            self.repositories.clone(),
            self.contract.clone(),
            self.daemon.clone(),
            self.proofs.clone(),
            self.clock.clone(),
            self.config.task.clone(),
            &self.config.storage_daemon,
        )
    }
}
