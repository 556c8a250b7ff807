use std::sync::Arc;

use crate::domain::cell::{
    load_dict, store_dict, Address, Cell, CellBuilder, CodecError, Dictionary,
};

const KEY_BITS: usize = 256;

/// Value reported by the registry when a provider has nothing to prove
pub const NO_NEXT_PROOF: i64 = -1;

/// Immutable parameters of a storage order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderInfo {
    pub torrent_hash: [u8; 32],
    pub file_merkle_hash: [u8; 32],
    pub file_size: u64,
    pub storage_period: u64,
    pub max_storage_proof_span: u64,
    pub max_storage_providers: u16,
    pub owner: Option<Address>,
    pub treasury: Option<Address>,
    pub treasury_fee_rate: u16,
}

/// Reward distribution progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardsParams {
    pub started: bool,
    pub total_rewards: u128,
    pub undistributed_rewards: u128,
    pub period_finish: u32,
    pub last_update_time: u32,
}

/// Registry entry of a single provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderEntry {
    pub registered_at: u32,
    pub last_proof_time: Option<u32>,
    pub last_proof_valid: Option<bool>,
    /// Piece index of the next proof, [`NO_NEXT_PROOF`] when unset
    pub next_proof: i64,
}

/// Four dictionaries keyed by the provider's 256-bit account id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRegistry {
    providers: Dictionary,
    last_proof_times: Dictionary,
    last_proof_valid: Dictionary,
    next_proofs: Dictionary,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self {
            providers: Dictionary::new(KEY_BITS),
            last_proof_times: Dictionary::new(KEY_BITS),
            last_proof_valid: Dictionary::new(KEY_BITS),
            next_proofs: Dictionary::new(KEY_BITS),
        }
    }
}

fn value_cell(value: u64, bits: usize) -> Result<Arc<Cell>, CodecError> {
    let mut builder = CellBuilder::new();
    builder.store_uint(value, bits)?;
    builder.build()
}

impl ProviderRegistry {
    /// Number of registered providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.providers.contains(&address.hash_key())
    }

    pub fn last_proof_time(&self, address: &Address) -> Result<Option<u32>, CodecError> {
        self.last_proof_times
            .get(&address.hash_key())
            .map(|cell| cell.parse().load_uint(32).map(|v| v as u32))
            .transpose()
    }

    pub fn next_proof(&self, address: &Address) -> Result<i64, CodecError> {
        match self.next_proofs.get(&address.hash_key()) {
            Some(cell) => Ok(cell.parse().load_uint(64)? as i64),
            None => Ok(NO_NEXT_PROOF),
        }
    }

    /// Full registry view of one provider, `None` when not registered
    pub fn entry(&self, address: &Address) -> Result<Option<ProviderEntry>, CodecError> {
        let key = address.hash_key();
        let registered_at = match self.providers.get(&key) {
            Some(cell) => cell.parse().load_uint(32)? as u32,
            None => return Ok(None),
        };
        let last_proof_valid = self
            .last_proof_valid
            .get(&key)
            .map(|cell| cell.parse().load_bit())
            .transpose()?;

        Ok(Some(ProviderEntry {
            registered_at,
            last_proof_time: self.last_proof_time(address)?,
            last_proof_valid,
            next_proof: self.next_proof(address)?,
        }))
    }

    /// Record a provider, as the contract does on registration and proof
    pub fn insert(&mut self, address: &Address, entry: ProviderEntry) -> Result<(), CodecError> {
        let key = address.hash_key();
        self.providers
            .insert(key, value_cell(u64::from(entry.registered_at), 32)?);
        if let Some(time) = entry.last_proof_time {
            self.last_proof_times
                .insert(key, value_cell(u64::from(time), 32)?);
        }
        if let Some(valid) = entry.last_proof_valid {
            self.last_proof_valid
                .insert(key, value_cell(u64::from(valid), 1)?);
        }
        if entry.next_proof != NO_NEXT_PROOF {
            self.next_proofs
                .insert(key, value_cell(entry.next_proof as u64, 64)?);
        }
        Ok(())
    }

    fn decode(cell: &Cell) -> Result<Self, CodecError> {
        let mut slice = cell.parse();
        Ok(Self {
            providers: load_dict(&mut slice, KEY_BITS)?,
            last_proof_times: load_dict(&mut slice, KEY_BITS)?,
            last_proof_valid: load_dict(&mut slice, KEY_BITS)?,
            next_proofs: load_dict(&mut slice, KEY_BITS)?,
        })
    }

    fn encode(&self) -> Result<Arc<Cell>, CodecError> {
        let mut builder = CellBuilder::new();
        store_dict(&mut builder, &self.providers)?;
        store_dict(&mut builder, &self.last_proof_times)?;
        store_dict(&mut builder, &self.last_proof_valid)?;
        store_dict(&mut builder, &self.next_proofs)?;
        builder.build()
    }
}

/// Decoded persistent data of a storage order contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageContractState {
    pub order: OrderInfo,
    pub rewards: RewardsParams,
    pub registry: ProviderRegistry,
}

impl StorageContractState {
    /// Decode the root data cell: refs are order info, rewards, providers
    pub fn decode(root: &Cell) -> Result<Self, CodecError> {
        let mut slice = root.parse();
        let order_cell = slice.load_ref()?;
        let rewards_cell = slice.load_ref()?;
        let providers_cell = slice.load_ref()?;

        let mut order_slice = order_cell.parse();
        let torrent_hash = order_slice.load_hash256()?;
        let file_merkle_hash = order_slice.load_hash256()?;
        let file_size = order_slice.load_uint(64)?;
        let storage_period = order_slice.load_uint(64)?;
        let max_storage_proof_span = order_slice.load_uint(64)?;
        let max_storage_providers = order_slice.load_uint(16)? as u16;

        let mut parties = order_slice.load_ref()?.parse();
        let owner = parties.load_address()?;
        let treasury = parties.load_address()?;
        let treasury_fee_rate = parties.load_uint(16)? as u16;

        let mut rewards_slice = rewards_cell.parse();
        let rewards = RewardsParams {
            started: rewards_slice.load_bit()?,
            total_rewards: rewards_slice.load_coins()?,
            undistributed_rewards: rewards_slice.load_coins()?,
            period_finish: rewards_slice.load_uint(32)? as u32,
            last_update_time: rewards_slice.load_uint(32)? as u32,
        };

        Ok(Self {
            order: OrderInfo {
                torrent_hash,
                file_merkle_hash,
                file_size,
                storage_period,
                max_storage_proof_span,
                max_storage_providers,
                owner,
                treasury,
                treasury_fee_rate,
            },
            rewards,
            registry: ProviderRegistry::decode(providers_cell)?,
        })
    }

    /// Decode the base64 BoC returned by the node for an account's data
    pub fn from_boc_base64(data: &str) -> Result<Self, CodecError> {
        let root = Cell::from_boc_base64(data)?;
        Self::decode(&root)
    }

    pub fn encode(&self) -> Result<Arc<Cell>, CodecError> {
        let mut parties = CellBuilder::new();
        parties
            .store_address(self.order.owner.as_ref())?
            .store_address(self.order.treasury.as_ref())?
            .store_uint(u64::from(self.order.treasury_fee_rate), 16)?;

        let mut order = CellBuilder::new();
        order
            .store_hash256(&self.order.torrent_hash)?
            .store_hash256(&self.order.file_merkle_hash)?
            .store_uint(self.order.file_size, 64)?
            .store_uint(self.order.storage_period, 64)?
            .store_uint(self.order.max_storage_proof_span, 64)?
            .store_uint(u64::from(self.order.max_storage_providers), 16)?
            .store_ref(parties.build()?)?;

        let mut rewards = CellBuilder::new();
        rewards
            .store_bit(self.rewards.started)?
            .store_coins(self.rewards.total_rewards)?
            .store_coins(self.rewards.undistributed_rewards)?
            .store_uint(u64::from(self.rewards.period_finish), 32)?
            .store_uint(u64::from(self.rewards.last_update_time), 32)?;

        let mut root = CellBuilder::new();
        root.store_ref(order.build()?)?
            .store_ref(rewards.build()?)?
            .store_ref(self.registry.encode()?)?;
        root.build()
    }

    /// Provider slots still open; negative when over-subscribed
    pub fn residual_slots(&self) -> i64 {
        i64::from(self.order.max_storage_providers) - self.registry.len() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(seed: u8) -> Address {
        Address::new(0, [seed; 32])
    }

    fn sample_state() -> StorageContractState {
        let mut registry = ProviderRegistry::default();
        registry
            .insert(
                &address(1),
                ProviderEntry {
                    registered_at: 1_700_000_000,
                    last_proof_time: Some(1_700_000_500),
                    last_proof_valid: Some(true),
                    next_proof: 42,
                },
            )
            .unwrap();
        registry
            .insert(
                &address(2),
                ProviderEntry {
                    registered_at: 1_700_000_100,
                    last_proof_time: None,
                    last_proof_valid: None,
                    next_proof: NO_NEXT_PROOF,
                },
            )
            .unwrap();

        StorageContractState {
            order: OrderInfo {
                torrent_hash: [0xaa; 32],
                file_merkle_hash: [0xbb; 32],
                file_size: 10_485_760,
                storage_period: 2_592_000,
                max_storage_proof_span: 3_600,
                max_storage_providers: 3,
                owner: Some(address(9)),
                treasury: None,
                treasury_fee_rate: 100,
            },
            rewards: RewardsParams {
                started: true,
                total_rewards: 500_000_000,
                undistributed_rewards: 123,
                period_finish: 1_702_592_000,
                last_update_time: 1_700_000_600,
            },
            registry,
        }
    }

    #[test]
    fn test_decode_encoded_state() {
        let state = sample_state();
        let encoded = state.encode().unwrap();
        let decoded =
            StorageContractState::from_boc_base64(&encoded.to_boc_base64()).unwrap();
        assert_eq!(decoded, state);
        assert_eq!(decoded.residual_slots(), 1);
    }

    #[test]
    fn test_registry_lookups() {
        let state = sample_state();
        let registry = &state.registry;

        let first = registry.entry(&address(1)).unwrap().unwrap();
        assert_eq!(first.last_proof_time, Some(1_700_000_500));
        assert_eq!(first.next_proof, 42);

        let second = registry.entry(&address(2)).unwrap().unwrap();
        assert_eq!(second.next_proof, NO_NEXT_PROOF);
        assert_eq!(second.last_proof_time, None);

        assert!(registry.entry(&address(3)).unwrap().is_none());
        assert_eq!(registry.next_proof(&address(3)).unwrap(), NO_NEXT_PROOF);
        // workchain is not part of the registry key
        assert!(registry.contains(&Address::new(-1, [1; 32])));
    }

    #[test]
    fn test_truncated_state_is_malformed() {
        let mut root = CellBuilder::new();
        root.store_ref(CellBuilder::new().build().unwrap()).unwrap();
        let root = root.build().unwrap();
        assert!(matches!(
            StorageContractState::decode(&root),
            Err(CodecError::MalformedCell(_))
        ));
    }
}
