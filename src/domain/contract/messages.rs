use std::sync::Arc;

use crate::domain::cell::{Address, Cell, CellBuilder, CodecError};

use super::ops::{
    OP_CLAIM_STORAGE_REWARDS, OP_REGISTER_AS_STORAGE_PROVIDER, OP_SUBMIT_STORAGE_PROOF,
};

/// Value attached to every provider message: 0.1 TON
pub const MESSAGE_VALUE_NANOTONS: u128 = 100_000_000;

const PROOFS_PER_CELL: usize = 3;

/// A 256-bit merkle proof element
pub type ProofValue = [u8; 32];

fn header(op: u32, query_id: u64) -> Result<CellBuilder, CodecError> {
    let mut builder = CellBuilder::new();
    builder.store_uint(u64::from(op), 32)?.store_uint(query_id, 64)?;
    Ok(builder)
}

pub fn register_body(query_id: u64) -> Result<Arc<Cell>, CodecError> {
    header(OP_REGISTER_AS_STORAGE_PROVIDER, query_id)?.build()
}

pub fn claim_rewards_body(query_id: u64) -> Result<Arc<Cell>, CodecError> {
    header(OP_CLAIM_STORAGE_REWARDS, query_id)?.build()
}

/// Proof submission: the header, then a chain of cells holding
/// three proof values each, linked through their first reference.
pub fn submit_proof_body(query_id: u64, proofs: &[ProofValue]) -> Result<Arc<Cell>, CodecError> {
    let mut next: Option<Arc<Cell>> = None;
    for chunk in proofs.chunks(PROOFS_PER_CELL).rev() {
        let mut builder = CellBuilder::new();
        for proof in chunk {
            builder.store_hash256(proof)?;
        }
        if let Some(tail) = next.take() {
            builder.store_ref(tail)?;
        }
        next = Some(builder.build()?);
    }

    let mut body = header(OP_SUBMIT_STORAGE_PROOF, query_id)?;
    if let Some(chain) = next {
        body.store_ref(chain)?;
    }
    body.build()
}

/// Read back the proofs of a submission body
pub fn read_submitted_proofs(body: &Cell) -> Result<Vec<ProofValue>, CodecError> {
    let mut slice = body.parse();
    slice.skip_bits(32 + 64)?;
    let mut proofs = Vec::new();
    let mut current = if slice.remaining_refs() > 0 {
        Some(slice.load_ref()?.clone())
    } else {
        None
    };
    while let Some(cell) = current {
        let mut chunk = cell.parse();
        while chunk.remaining_bits() >= 256 {
            proofs.push(chunk.load_hash256()?);
        }
        current = if chunk.remaining_refs() > 0 {
            Some(chunk.load_ref()?.clone())
        } else {
            None
        };
    }
    Ok(proofs)
}

/// Single-cell slice holding an address, the argument form of the
/// per-provider get-methods
pub fn address_argument(address: &Address) -> Result<Arc<Cell>, CodecError> {
    let mut builder = CellBuilder::new();
    builder.store_address(Some(address))?;
    builder.build()
}

/// Leading op-code of a message body, if it carries one
pub fn read_op(body: &Cell) -> Option<u32> {
    let mut slice = body.parse();
    if slice.remaining_bits() < 32 {
        return None;
    }
    slice.load_uint(32).ok().map(|op| op as u32)
}

/// Parse a proof value as produced by the proof generator (hex, optional `0x`)
pub fn parse_proof_hex(value: &str) -> Result<ProofValue, CodecError> {
    let digits = value.trim().trim_start_matches("0x");
    if digits.is_empty() || digits.len() > 64 {
        return Err(CodecError::MalformedCell(format!(
            "proof value {} is not a 256-bit hex number",
            value
        )));
    }
    let padded = format!("{:0>64}", digits);
    let bytes = hex::decode(&padded)
        .map_err(|e| CodecError::MalformedCell(format!("proof value {}: {}", value, e)))?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proof_chain_layout() {
        let proofs: Vec<ProofValue> = (1..=7u8).map(|i| [i; 32]).collect();
        let body = submit_proof_body(0, &proofs).unwrap();

        assert_eq!(read_op(&body), Some(OP_SUBMIT_STORAGE_PROOF));
        assert_eq!(body.bit_len(), 96);

        let first = &body.refs()[0];
        assert_eq!(first.bit_len(), 768);
        let second = &first.refs()[0];
        assert_eq!(second.bit_len(), 768);
        let third = &second.refs()[0];
        assert_eq!(third.bit_len(), 256);
        assert!(third.refs().is_empty());

        assert_eq!(read_submitted_proofs(&body).unwrap(), proofs);
    }

    #[test]
    fn test_empty_proof_list() {
        let body = submit_proof_body(5, &[]).unwrap();
        assert!(body.refs().is_empty());
        assert!(read_submitted_proofs(&body).unwrap().is_empty());
    }

    #[test]
    fn test_simple_bodies() {
        let register = register_body(0).unwrap();
        assert_eq!(read_op(&register), Some(OP_REGISTER_AS_STORAGE_PROVIDER));
        let claim = claim_rewards_body(7).unwrap();
        let mut slice = claim.parse();
        assert_eq!(slice.load_uint(32).unwrap() as u32, OP_CLAIM_STORAGE_REWARDS);
        assert_eq!(slice.load_uint(64).unwrap(), 7);
    }

    #[test]
    fn test_read_op_on_short_body() {
        let empty = CellBuilder::new().build().unwrap();
        assert_eq!(read_op(&empty), None);
    }

    #[test]
    fn test_parse_proof_hex() {
        let value = parse_proof_hex("0x1f").unwrap();
        assert_eq!(value[31], 0x1f);
        assert!(value[..31].iter().all(|b| *b == 0));
        assert!(parse_proof_hex("zz").is_err());
        assert!(parse_proof_hex(&"1".repeat(65)).is_err());
    }
}
