use dotenv::dotenv;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_BAG_ADDRESS: &str = "EQAiRfFdxEf5dmSb2cEpq8pjhyHts6hmoI1woHqLRPRwZKuw";

/// TON network the agent runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TonNetwork {
    Testnet,
    Mainnet,
}

impl TonNetwork {
    /// Default toncenter endpoint of the network
    pub fn default_api_url(self) -> &'static str {
        match self {
            TonNetwork::Testnet => "https://testnet.toncenter.com",
            TonNetwork::Mainnet => "https://toncenter.com",
        }
    }
}

impl FromStr for TonNetwork {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "testnet" => Ok(TonNetwork::Testnet),
            "mainnet" => Ok(TonNetwork::Mainnet),
            other => Err(format!("unknown TON network {}", other)),
        }
    }
}

impl fmt::Display for TonNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TonNetwork::Testnet => write!(f, "testnet"),
            TonNetwork::Mainnet => write!(f, "mainnet"),
        }
    }
}

/// Configuration for the database
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Pool size
    pub max_connections: u32,
}

/// Configuration for chain access
#[derive(Debug, Clone)]
pub struct TonConfig {
    pub network: TonNetwork,
    /// toncenter v3 base URL
    pub api_url: String,
    pub api_key: Option<String>,
    /// Bag contract whose transactions are indexed
    pub bag_address: String,
    pub request_retries: u32,
    pub request_retry_delay_ms: u64,
}

/// Configuration for the remote wallet signer
#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub signer_url: String,
}

/// Configuration for the torrent storage daemon
#[derive(Debug, Clone)]
pub struct StorageDaemonConfig {
    pub url: String,
    /// Directory bags are downloaded into
    pub download_path: String,
}

/// Configuration for the proof generator
#[derive(Debug, Clone)]
pub struct ProofConfig {
    pub url: String,
}

/// Task selection and lifecycle limits
#[derive(Debug, Clone)]
pub struct TaskConfig {
    /// Minimum total rewards in nanotons
    pub min_reward: i64,
    /// Maximum file size in bytes
    pub max_file_size: i64,
    /// Minimum price metric
    pub min_price: f64,
    /// Minimum wallet balance in nanotons before sending messages
    pub provider_min_balance: u128,
    /// How long before the due time a proof may be submitted
    pub submit_proof_before_sec: i64,
    pub header_max_retries: i32,
    pub child_max_retries: i32,
    pub register_check_retries: u32,
    pub register_check_interval_ms: u64,
    pub ack_retries: u32,
    pub ack_interval_ms: u64,
    pub claim_retries: u32,
    pub claim_interval_ms: u64,
}

/// Sleep intervals of the polling units
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Pause between indexer iterations
    pub indexer_interval_ms: u64,
    /// Pause between ancestor fetches of one backward walk
    pub indexer_walk_delay_ms: u64,
    /// Pause when a unit found nothing to do
    pub idle_ms: u64,
    /// Pause between non-empty batches
    pub batch_interval_ms: u64,
}

impl PollConfig {
    pub fn idle(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }

    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub ton: TonConfig,
    pub wallet: WalletConfig,
    pub storage_daemon: StorageDaemonConfig,
    pub proof: ProofConfig,
    pub task: TaskConfig,
    pub poll: PollConfig,
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        // Ensure .env file is loaded
        dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup; missing or
    /// unparsable values fall back to their defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database = DatabaseConfig {
            url: text("DATABASE_URL", "sqlite://./data/db.sqlite?mode=rwc"),
            max_connections: parse_or(lookup("DATABASE_MAX_CONNECTIONS"), 5),
        };

        let network = parse_or(lookup("TON_NETWORK"), TonNetwork::Testnet);
        let ton = TonConfig {
            network,
            api_url: text("TON_API_URL", network.default_api_url()),
            api_key: lookup("TON_API_KEY").filter(|key| !key.trim().is_empty()),
            bag_address: text("TON_BAG_ADDRESS", DEFAULT_BAG_ADDRESS),
            request_retries: parse_or(lookup("TON_REQUEST_RETRIES"), 3),
            request_retry_delay_ms: parse_or(lookup("TON_REQUEST_RETRY_DELAY_MS"), 1000),
        };

        let wallet = WalletConfig {
            signer_url: text("TON_WALLET_SIGNER_URL", "http://127.0.0.1:8090"),
        };

        let storage_daemon = StorageDaemonConfig {
            url: text("STORAGE_DAEMON_URL", "http://127.0.0.1:8192"),
            download_path: text("STORAGE_DOWNLOAD_PATH", "/root/downloads"),
        };

        let proof = ProofConfig {
            url: text("PROOF_API_URL", "http://127.0.0.1:8193"),
        };

        let task = TaskConfig {
            min_reward: parse_or(lookup("TASK_MIN_REWARD"), 0),
            max_file_size: parse_or(lookup("TASK_MAX_FILE_SIZE"), 10_485_760),
            min_price: parse_or(lookup("TASK_MIN_PRICE"), 0.0),
            provider_min_balance: parse_or(lookup("TASK_PROVIDER_MIN_BALANCE"), 1_000_000_000),
            submit_proof_before_sec: parse_or(lookup("TASK_SUBMIT_PROOF_BEFORE_SEC"), 600),
            header_max_retries: parse_or(lookup("TASK_HEADER_MAX_RETRIES"), 10),
            child_max_retries: parse_or(lookup("TASK_CHILD_MAX_RETRIES"), 10),
            register_check_retries: parse_or(lookup("TASK_REGISTER_CHECK_RETRIES"), 10),
            register_check_interval_ms: parse_or(lookup("TASK_REGISTER_CHECK_INTERVAL_MS"), 3000),
            ack_retries: parse_or(lookup("TASK_ACK_RETRIES"), 5),
            ack_interval_ms: parse_or(lookup("TASK_ACK_INTERVAL_MS"), 1000),
            claim_retries: parse_or(lookup("TASK_CLAIM_RETRIES"), 10),
            claim_interval_ms: parse_or(lookup("TASK_CLAIM_INTERVAL_MS"), 2000),
        };

        let poll = PollConfig {
            indexer_interval_ms: parse_or(lookup("POLL_INDEXER_INTERVAL_MS"), 10_000),
            indexer_walk_delay_ms: parse_or(lookup("POLL_INDEXER_WALK_DELAY_MS"), 500),
            idle_ms: parse_or(lookup("POLL_IDLE_MS"), 10_000),
            batch_interval_ms: parse_or(lookup("POLL_BATCH_INTERVAL_MS"), 1000),
        };

        Self {
            database,
            ton,
            wallet,
            storage_daemon,
            proof,
            task,
            poll,
        }
    }
}
