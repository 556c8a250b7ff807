use serde::{Deserialize, Serialize};

use crate::domain::contract::is_order_placement;

/// Inbound message summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMessage {
    pub source: Option<String>,
    pub dest: Option<String>,
    /// Attached value in nanotons
    pub value: String,
}

/// First outbound message summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutMessage {
    pub dest: Option<String>,
    pub value: String,
}

/// JSON blob stored in `transactions.detail`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_message: Option<InMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_message: Option<OutMessage>,
}

impl TransactionDetail {
    /// Address of the contract created by an order placement
    pub fn order_address(&self) -> Option<&str> {
        self.out_message
            .as_ref()
            .and_then(|message| message.dest.as_deref())
    }
}

/// A transaction as reported by the chain, normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTransaction {
    /// 64 lowercase hex characters
    pub hash: String,
    pub lt: u64,
    pub prev_lt: u64,
    pub prev_hash: String,
    pub op_code: String,
    pub exit_code: i32,
    pub detail: TransactionDetail,
}

/// Transaction row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub id: i64,
    pub address: String,
    pub tx_hash: String,
    pub lt: i64,
    pub op_code: String,
    pub exit_code: i32,
    pub detail: TransactionDetail,
    pub is_order_placement: bool,
}

/// Values inserted by the indexer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub address: String,
    pub tx_hash: String,
    pub lt: i64,
    pub op_code: String,
    pub exit_code: i32,
    pub detail: TransactionDetail,
    pub is_order_placement: bool,
}

impl NewTransaction {
    pub fn from_chain(address: &str, tx: &ChainTransaction) -> Self {
        Self {
            address: address.to_string(),
            tx_hash: tx.hash.clone(),
            lt: i64::try_from(tx.lt).unwrap_or(i64::MAX),
            op_code: tx.op_code.clone(),
            exit_code: tx.exit_code,
            detail: tx.detail.clone(),
            is_order_placement: is_order_placement(&tx.op_code, tx.exit_code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contract::{format_op, OP_PLACE_STORAGE_ORDER};

    fn chain_tx(op_code: String, exit_code: i32) -> ChainTransaction {
        ChainTransaction {
            hash: "ab".repeat(32),
            lt: 100,
            prev_lt: 90,
            prev_hash: "cd".repeat(32),
            op_code,
            exit_code,
            detail: TransactionDetail {
                in_message: None,
                out_message: Some(OutMessage {
                    dest: Some("EQorder".to_string()),
                    value: "1000".to_string(),
                }),
            },
        }
    }

    #[test]
    fn test_flag_follows_op_and_exit_code() {
        let place = format_op(Some(OP_PLACE_STORAGE_ORDER));
        assert!(
            NewTransaction::from_chain("EQbag", &chain_tx(place.clone(), 0)).is_order_placement
        );
        assert!(!NewTransaction::from_chain("EQbag", &chain_tx(place, 37)).is_order_placement);
        assert!(
            !NewTransaction::from_chain("EQbag", &chain_tx("1234".to_string(), 0))
                .is_order_placement
        );
    }

    #[test]
    fn test_detail_json_shape() {
        let detail = chain_tx("none".to_string(), -1).detail;
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["out_message"]["dest"], "EQorder");
        assert!(json.get("in_message").is_none());

        let parsed: TransactionDetail = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.order_address(), None);
        assert_eq!(detail.order_address(), Some("EQorder"));
    }
}
