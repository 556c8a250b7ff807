//! toncenter v3 HTTP API provider

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ChainError;
use super::provider::{
    AccountState, AccountStatus, ChainProvider, StackEntry, TransactionId, TransactionLookup,
};
use super::retry_handler::RetryHandler;
use crate::domain::cell::{Address, Cell};
use crate::domain::contract::{format_op, read_op, EXIT_NO_COMPUTE_PHASE};
use crate::domain::models::{ChainTransaction, InMessage, OutMessage, TransactionDetail};
use crate::utils::logging;

const API_KEY_HEADER: &str = "X-API-Key";

/// Chain provider backed by a toncenter v3 endpoint
#[derive(Debug)]
pub struct ToncenterProvider {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
    retry_handler: RetryHandler,
}

impl ToncenterProvider {
    /// Create a new toncenter provider
    pub fn new(endpoint: String, api_key: Option<String>, retry_handler: RetryHandler) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
            client: Client::new(),
            retry_handler,
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ChainError> {
        let mut request = self
            .client
            .get(format!("{}{}", self.endpoint, path))
            .query(query);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        read_json(request.send().await?).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ChainError> {
        let mut request = self
            .client
            .post(format!("{}{}", self.endpoint, path))
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        read_json(request.send().await?).await
    }

    async fn fetch_transaction(
        &self,
        address: &str,
        lt: u64,
        hash: &str,
    ) -> Result<Option<ChainTransaction>, ChainError> {
        let query = [
            ("account", address.to_string()),
            ("lt", lt.to_string()),
            ("hash", hash.to_string()),
            ("limit", "1".to_string()),
        ];
        let response = self
            .retry_handler
            .execute_with_retry_and_logging(
                || self.get_json("/api/v3/transactions", &query),
                "get_transaction",
            )
            .await?;
        parse_transactions(response).map(|transactions| transactions.into_iter().next())
    }
}

#[async_trait]
impl ChainProvider for ToncenterProvider {
    fn provider_name(&self) -> String {
        "toncenter".to_string()
    }

    async fn get_account_state(&self, address: &str) -> Result<AccountState, ChainError> {
        let query = [("address", address.to_string())];
        let result = self
            .retry_handler
            .execute_with_retry_and_logging(
                || self.get_json("/api/v3/account", &query),
                "get_account_state",
            )
            .await;

        match result {
            Ok(response) => parse_account(response),
            Err(ChainError::Http { status: 404, .. }) => Ok(AccountState::nonexistent()),
            Err(e) => Err(e),
        }
    }

    async fn get_transaction(&self, address: &str, lt: u64, hash: &str) -> TransactionLookup {
        match self.fetch_transaction(address, lt, hash).await {
            Ok(Some(transaction)) => TransactionLookup::Found(transaction),
            Ok(None) => TransactionLookup::Expired,
            Err(e) if e.is_unknown_transaction() => TransactionLookup::Expired,
            Err(e) => {
                logging::log_error(&format!(
                    "[TON] Failed to fetch transaction {}:{} of {}: {}",
                    lt, hash, address, e
                ));
                TransactionLookup::Failed(e.to_string())
            }
        }
    }

    async fn run_get_method(
        &self,
        address: &str,
        method: &str,
        stack: Vec<StackEntry>,
    ) -> Result<Vec<StackEntry>, ChainError> {
        let body = json!({
            "address": address,
            "method": method,
            "stack": stack.iter().map(stack_entry_json).collect::<Vec<_>>(),
        });
        let response = self
            .retry_handler
            .execute_with_retry_and_logging(
                || self.post_json("/api/v3/runGetMethod", &body),
                "run_get_method",
            )
            .await?;
        parse_get_method(method, response)
    }
}

async fn read_json(response: Response) -> Result<Value, ChainError> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(ChainError::Http {
            status: status.as_u16(),
            body: text,
        });
    }
    serde_json::from_str(&text).map_err(|e| ChainError::Parse(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    balance: Option<String>,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    last_transaction_lt: Option<String>,
    #[serde(default)]
    last_transaction_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTransactions {
    #[serde(default)]
    transactions: Vec<RawTransaction>,
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    hash: String,
    lt: String,
    #[serde(default)]
    prev_trans_hash: Option<String>,
    #[serde(default)]
    prev_trans_lt: Option<String>,
    #[serde(default)]
    description: Option<RawDescription>,
    #[serde(default)]
    in_msg: Option<RawMessage>,
    #[serde(default)]
    out_msgs: Vec<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawDescription {
    #[serde(default)]
    compute_ph: Option<RawComputePhase>,
}

#[derive(Debug, Deserialize)]
struct RawComputePhase {
    #[serde(default)]
    skipped: bool,
    #[serde(default)]
    exit_code: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    destination: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    opcode: Option<Value>,
    #[serde(default)]
    message_content: Option<RawMessageContent>,
}

#[derive(Debug, Deserialize)]
struct RawMessageContent {
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawGetMethod {
    #[serde(default)]
    exit_code: i64,
    #[serde(default)]
    stack: Vec<RawStackEntry>,
}

#[derive(Debug, Deserialize)]
struct RawStackEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    value: Option<Value>,
}

fn parse_account(response: Value) -> Result<AccountState, ChainError> {
    let raw: RawAccount =
        serde_json::from_value(response).map_err(|e| ChainError::Parse(e.to_string()))?;

    let balance = match raw.balance.as_deref() {
        Some(value) => parse_u128(value)?,
        None => 0,
    };
    let last_transaction = match (raw.last_transaction_lt, raw.last_transaction_hash) {
        (Some(lt), Some(hash)) => {
            let lt = parse_u64(&lt)?;
            if lt == 0 {
                None
            } else {
                Some(TransactionId {
                    lt,
                    hash: normalize_hash(&hash)?,
                })
            }
        }
        _ => None,
    };

    Ok(AccountState {
        status: AccountStatus::parse(raw.status.as_deref().unwrap_or("nonexist")),
        balance,
        data: raw.data.filter(|data| !data.is_empty()),
        last_transaction,
    })
}

fn parse_transactions(response: Value) -> Result<Vec<ChainTransaction>, ChainError> {
    let raw: RawTransactions =
        serde_json::from_value(response).map_err(|e| ChainError::Parse(e.to_string()))?;
    raw.transactions.into_iter().map(to_chain_transaction).collect()
}

fn to_chain_transaction(raw: RawTransaction) -> Result<ChainTransaction, ChainError> {
    let prev_lt = match raw.prev_trans_lt.as_deref() {
        Some(value) => parse_u64(value)?,
        None => 0,
    };
    let prev_hash = match raw.prev_trans_hash.as_deref() {
        Some(value) if prev_lt != 0 => normalize_hash(value)?,
        _ => String::new(),
    };
    let exit_code = raw
        .description
        .and_then(|description| description.compute_ph)
        .filter(|phase| !phase.skipped)
        .and_then(|phase| phase.exit_code)
        .unwrap_or(EXIT_NO_COMPUTE_PHASE);

    let op_code = format_op(raw.in_msg.as_ref().and_then(message_op));
    let detail = TransactionDetail {
        in_message: raw.in_msg.as_ref().map(|message| InMessage {
            source: message.source.as_deref().map(normalize_address),
            dest: message.destination.as_deref().map(normalize_address),
            value: message.value.clone().unwrap_or_else(|| "0".to_string()),
        }),
        out_message: raw.out_msgs.first().map(|message| OutMessage {
            dest: message.destination.as_deref().map(normalize_address),
            value: message.value.clone().unwrap_or_else(|| "0".to_string()),
        }),
    };

    Ok(ChainTransaction {
        hash: normalize_hash(&raw.hash)?,
        lt: parse_u64(&raw.lt)?,
        prev_lt,
        prev_hash,
        op_code,
        exit_code,
        detail,
    })
}

/// Op of an inbound message: read from the body when it decodes, else the indexed opcode
fn message_op(message: &RawMessage) -> Option<u32> {
    let from_body = message
        .message_content
        .as_ref()
        .and_then(|content| content.body.as_deref())
        .and_then(|body| Cell::from_boc_base64(body).ok())
        .and_then(|cell| read_op(&cell));

    from_body.or_else(|| match message.opcode.as_ref()? {
        Value::String(value) => parse_opcode(value),
        Value::Number(value) => value.as_i64().map(|op| op as u32),
        _ => None,
    })
}

fn parse_opcode(value: &str) -> Option<u32> {
    let value = value.trim();
    if let Some(hex_value) = value.strip_prefix("0x") {
        u32::from_str_radix(hex_value, 16).ok()
    } else {
        value.parse::<i64>().ok().map(|op| op as u32)
    }
}

fn parse_get_method(method: &str, response: Value) -> Result<Vec<StackEntry>, ChainError> {
    let raw: RawGetMethod =
        serde_json::from_value(response).map_err(|e| ChainError::Parse(e.to_string()))?;
    if raw.exit_code != 0 && raw.exit_code != 1 {
        return Err(ChainError::GetMethod {
            method: method.to_string(),
            exit_code: raw.exit_code,
        });
    }

    raw.stack
        .into_iter()
        .map(|entry| {
            let value = entry
                .value
                .as_ref()
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ChainError::Parse(format!("stack entry {} has no value", entry.kind))
                })?;
            match entry.kind.as_str() {
                "num" => parse_num(value).map(StackEntry::Num),
                "cell" => Ok(StackEntry::Cell(value.to_string())),
                "slice" => Ok(StackEntry::Slice(value.to_string())),
                other => Err(ChainError::Parse(format!("unsupported stack entry {}", other))),
            }
        })
        .collect()
}

fn stack_entry_json(entry: &StackEntry) -> Value {
    match entry {
        StackEntry::Num(value) if *value < 0 => {
            json!({ "type": "num", "value": format!("-0x{:x}", value.unsigned_abs()) })
        }
        StackEntry::Num(value) => json!({ "type": "num", "value": format!("0x{:x}", value) }),
        StackEntry::Cell(boc) => json!({ "type": "cell", "value": boc }),
        StackEntry::Slice(boc) => json!({ "type": "slice", "value": boc }),
    }
}

fn parse_num(value: &str) -> Result<i128, ChainError> {
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let magnitude = match digits.strip_prefix("0x") {
        Some(hex_digits) => i128::from_str_radix(hex_digits, 16),
        None => digits.parse::<i128>(),
    }
    .map_err(|e| ChainError::Parse(format!("number {}: {}", value, e)))?;

    Ok(if negative { -magnitude } else { magnitude })
}

fn parse_u64(value: &str) -> Result<u64, ChainError> {
    value
        .parse()
        .map_err(|e| ChainError::Parse(format!("integer {}: {}", value, e)))
}

fn parse_u128(value: &str) -> Result<u128, ChainError> {
    value
        .parse()
        .map_err(|e| ChainError::Parse(format!("integer {}: {}", value, e)))
}

/// Transaction hashes arrive as base64 or hex; store 64 lowercase hex chars
fn normalize_hash(value: &str) -> Result<String, ChainError> {
    if value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(value.to_ascii_lowercase());
    }
    let bytes = STANDARD
        .decode(value)
        .or_else(|_| URL_SAFE.decode(value))
        .map_err(|e| ChainError::Parse(format!("hash {}: {}", value, e)))?;
    if bytes.len() != 32 {
        return Err(ChainError::Parse(format!("hash {} is not 32 bytes", value)));
    }
    Ok(hex::encode(bytes))
}

/// Render addresses in one friendly form; unparsable values are kept verbatim
fn normalize_address(value: &str) -> String {
    value
        .parse::<Address>()
        .map(|address| address.to_string())
        .unwrap_or_else(|_| value.to_string())
}
