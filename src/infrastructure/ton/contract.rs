//! Typed proxy over a storage order contract

use async_trait::async_trait;
use std::sync::Arc;

use super::error::ChainError;
use super::provider::{ChainProvider, StackEntry};
use super::wallet::{OutgoingMessage, WalletSigner};
use crate::domain::cell::{Address, Cell};
use crate::domain::contract::{
    address_argument, claim_rewards_body, register_body, submit_proof_body, ProofValue,
    StorageContractState, MESSAGE_VALUE_NANOTONS,
};

const GET_METHOD_EARNED: &str = "earned";

/// Reads and actions on storage order contracts, performed as this provider
#[async_trait]
pub trait StorageContract: Send + Sync + std::fmt::Debug {
    /// Wallet address this agent provides storage from
    fn provider_address(&self) -> Address;

    /// Decoded contract data; `None` when the contract is not active
    async fn order_state(&self, address: &str) -> Result<Option<StorageContractState>, ChainError>;

    /// Rewards this provider can currently claim from the order
    async fn earned(&self, address: &str) -> Result<u128, ChainError>;

    async fn register(&self, address: &str) -> Result<(), ChainError>;

    async fn submit_proof(&self, address: &str, proofs: &[ProofValue]) -> Result<(), ChainError>;

    async fn claim_rewards(&self, address: &str) -> Result<(), ChainError>;

    /// Provider wallet balance in nanotons; `None` when the wallet is not active
    async fn provider_balance(&self) -> Result<Option<u128>, ChainError>;
}

/// [`StorageContract`] over a chain provider and a wallet signer
#[derive(Debug, Clone)]
pub struct TonStorageContract {
    provider: Arc<dyn ChainProvider>,
    wallet: Arc<dyn WalletSigner>,
}

impl TonStorageContract {
    pub fn new(provider: Arc<dyn ChainProvider>, wallet: Arc<dyn WalletSigner>) -> Self {
        Self { provider, wallet }
    }

    async fn send(&self, address: &str, body: Arc<Cell>) -> Result<(), ChainError> {
        let to = address.parse::<Address>()?;
        self.wallet
            .send(OutgoingMessage {
                to,
                value: MESSAGE_VALUE_NANOTONS,
                bounce: true,
                body,
            })
            .await
    }
}

fn query_id() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

#[async_trait]
impl StorageContract for TonStorageContract {
    fn provider_address(&self) -> Address {
        self.wallet.address()
    }

    async fn order_state(&self, address: &str) -> Result<Option<StorageContractState>, ChainError> {
        let account = self.provider.get_account_state(address).await?;
        if !account.is_active() {
            return Ok(None);
        }
        match account.data {
            Some(data) => Ok(Some(StorageContractState::from_boc_base64(&data)?)),
            None => Ok(None),
        }
    }

    async fn earned(&self, address: &str) -> Result<u128, ChainError> {
        let argument = address_argument(&self.wallet.address())?;
        let stack = self
            .provider
            .run_get_method(
                address,
                GET_METHOD_EARNED,
                vec![StackEntry::Slice(argument.to_boc_base64())],
            )
            .await?;

        let value = stack
            .first()
            .and_then(StackEntry::as_num)
            .ok_or_else(|| ChainError::Parse("earned returned no number".to_string()))?;
        u128::try_from(value)
            .map_err(|_| ChainError::Parse(format!("earned returned negative {}", value)))
    }

    async fn register(&self, address: &str) -> Result<(), ChainError> {
        self.send(address, register_body(query_id())?).await
    }

    async fn submit_proof(&self, address: &str, proofs: &[ProofValue]) -> Result<(), ChainError> {
        self.send(address, submit_proof_body(query_id(), proofs)?).await
    }

    async fn claim_rewards(&self, address: &str) -> Result<(), ChainError> {
        self.send(address, claim_rewards_body(query_id())?).await
    }

    async fn provider_balance(&self) -> Result<Option<u128>, ChainError> {
        let account = self
            .provider
            .get_account_state(&self.wallet.address().to_string())
            .await?;
        Ok(account.is_active().then_some(account.balance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contract::messages::read_submitted_proofs;
    use crate::domain::contract::ops::{OP_REGISTER_AS_STORAGE_PROVIDER, OP_SUBMIT_STORAGE_PROOF};
    use crate::domain::contract::{read_op, OrderInfo, ProviderRegistry, RewardsParams};
    use crate::infrastructure::ton::provider::{AccountState, AccountStatus, TransactionLookup};
    use std::sync::Mutex;

    #[derive(Debug)]
    struct StubProvider {
        account: AccountState,
        earned: Vec<StackEntry>,
    }

    #[async_trait]
    impl ChainProvider for StubProvider {
        fn provider_name(&self) -> String {
            "stub".to_string()
        }

        async fn get_account_state(&self, _address: &str) -> Result<AccountState, ChainError> {
            Ok(self.account.clone())
        }

        async fn get_transaction(
            &self,
            _address: &str,
            _lt: u64,
            _hash: &str,
        ) -> TransactionLookup {
            TransactionLookup::Expired
        }

        async fn run_get_method(
            &self,
            _address: &str,
            method: &str,
            stack: Vec<StackEntry>,
        ) -> Result<Vec<StackEntry>, ChainError> {
            assert_eq!(method, GET_METHOD_EARNED);
            assert!(matches!(stack.as_slice(), [StackEntry::Slice(_)]));
            Ok(self.earned.clone())
        }
    }

    #[derive(Debug, Default)]
    struct RecordingWallet {
        sent: Mutex<Vec<OutgoingMessage>>,
    }

    #[async_trait]
    impl WalletSigner for RecordingWallet {
        fn address(&self) -> Address {
            Address::new(0, [0xAA; 32])
        }

        async fn send(&self, message: OutgoingMessage) -> Result<(), ChainError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn sample_state() -> StorageContractState {
        StorageContractState {
            order: OrderInfo {
                torrent_hash: [1; 32],
                file_merkle_hash: [2; 32],
                file_size: 4096,
                storage_period: 86_400,
                max_storage_proof_span: 3_600,
                max_storage_providers: 2,
                owner: Some(Address::new(0, [3; 32])),
                treasury: None,
                treasury_fee_rate: 0,
            },
            rewards: RewardsParams {
                started: true,
                total_rewards: 1_000_000_000,
                undistributed_rewards: 1_000_000_000,
                period_finish: 1_700_086_400,
                last_update_time: 1_700_000_000,
            },
            registry: ProviderRegistry::default(),
        }
    }

    fn account(status: AccountStatus, data: Option<String>) -> AccountState {
        AccountState {
            status,
            balance: 5_000_000_000,
            data,
            last_transaction: None,
        }
    }

    fn contract(
        account: AccountState,
        earned: Vec<StackEntry>,
    ) -> (TonStorageContract, Arc<RecordingWallet>) {
        let wallet = Arc::new(RecordingWallet::default());
        let provider = Arc::new(StubProvider { account, earned });
        (TonStorageContract::new(provider, wallet.clone()), wallet)
    }

    #[tokio::test]
    async fn test_order_state_decodes_data() {
        let state = sample_state();
        let data = state.encode().unwrap().to_boc_base64();
        let (contract, _) = contract(account(AccountStatus::Active, Some(data)), vec![]);

        let decoded = contract.order_state("EQorder").await.unwrap();
        assert_eq!(decoded, Some(state));
        assert_eq!(contract.provider_balance().await.unwrap(), Some(5_000_000_000));
    }

    #[tokio::test]
    async fn test_inactive_contract_has_no_state() {
        let (contract, _) = contract(account(AccountStatus::Frozen, None), vec![]);
        assert_eq!(contract.order_state("EQorder").await.unwrap(), None);
        assert_eq!(contract.provider_balance().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_earned() {
        let (positive, _) =
            contract(account(AccountStatus::Active, None), vec![StackEntry::Num(42)]);
        assert_eq!(positive.earned("EQorder").await.unwrap(), 42);

        let (negative, _) =
            contract(account(AccountStatus::Active, None), vec![StackEntry::Num(-1)]);
        assert!(matches!(
            negative.earned("EQorder").await,
            Err(ChainError::Parse(_))
        ));

        let (contract, _) = contract_without_number();
        assert!(matches!(
            contract.earned("EQorder").await,
            Err(ChainError::Parse(_))
        ));
    }

    fn contract_without_number() -> (TonStorageContract, Arc<RecordingWallet>) {
        contract(
            account(AccountStatus::Active, None),
            vec![StackEntry::Cell("te6cckEBAQEAAgAAAEysuc0=".to_string())],
        )
    }

    #[tokio::test]
    async fn test_messages_sent_from_wallet() {
        let order = Address::new(0, [9; 32]);
        let (contract, wallet) = contract(account(AccountStatus::Active, None), vec![]);

        contract.register(&order.to_string()).await.unwrap();
        contract
            .submit_proof(&order.to_string(), &[[5; 32], [6; 32]])
            .await
            .unwrap();

        let sent = wallet.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, order);
        assert_eq!(sent[0].value, MESSAGE_VALUE_NANOTONS);
        assert!(sent[0].bounce);
        assert_eq!(read_op(&sent[0].body), Some(OP_REGISTER_AS_STORAGE_PROVIDER));
        assert_eq!(read_op(&sent[1].body), Some(OP_SUBMIT_STORAGE_PROOF));
        assert_eq!(read_submitted_proofs(&sent[1].body).unwrap(), vec![[5; 32], [6; 32]]);
    }

    #[tokio::test]
    async fn test_invalid_destination() {
        let (contract, wallet) = contract(account(AccountStatus::Active, None), vec![]);
        assert!(contract.claim_rewards("not an address").await.is_err());
        assert!(wallet.sent.lock().unwrap().is_empty());
    }
}
