//! Storage order contract: op-codes, message bodies, persistent state and
//! the derived price metric.

pub mod messages;
pub mod ops;
pub mod price;
pub mod state;

pub use messages::{
    address_argument, claim_rewards_body, parse_proof_hex, read_op, register_body,
    submit_proof_body, ProofValue, MESSAGE_VALUE_NANOTONS,
};
pub use ops::{
    format_op, is_order_placement, EXIT_NO_COMPUTE_PHASE, EXIT_SUCCESS, OP_NONE,
    OP_PLACE_STORAGE_ORDER,
};
pub use price::{order_price, order_price_f64, PriceError};
pub use state::{
    OrderInfo, ProviderEntry, ProviderRegistry, RewardsParams, StorageContractState,
    NO_NEXT_PROOF,
};
