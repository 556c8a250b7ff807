//! Cell codec for the TON serialization primitives.
//!
//! A cell holds up to 1023 data bits and up to 4 references to child cells.
//! Contract state and message bodies travel as a "bag of cells" (BoC):
//! a flat, index-linked serialization of a cell tree.

mod address;
mod boc;
mod builder;
mod dict;
mod error;
mod slice;

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub use address::Address;
pub use boc::{parse_boc, serialize_boc};
pub use builder::CellBuilder;
pub use dict::{load_dict, store_dict, DictKey, Dictionary};
pub use error::CodecError;
pub use slice::CellSlice;

/// Maximum number of data bits in one cell
pub const MAX_CELL_BITS: usize = 1023;
/// Maximum number of references in one cell
pub const MAX_CELL_REFS: usize = 4;

/// An ordinary cell: a bit string plus child references
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl Cell {
    /// Create a cell, validating its capacity.
    /// Bits past `bit_len` in the last byte are cleared.
    pub fn new(
        mut data: Vec<u8>,
        bit_len: usize,
        refs: Vec<Arc<Cell>>,
    ) -> Result<Self, CodecError> {
        if bit_len > MAX_CELL_BITS {
            return Err(CodecError::CellOverflow(format!(
                "{} bits exceed the {} bit limit",
                bit_len, MAX_CELL_BITS
            )));
        }
        if refs.len() > MAX_CELL_REFS {
            return Err(CodecError::CellOverflow(format!(
                "{} references exceed the {} reference limit",
                refs.len(),
                MAX_CELL_REFS
            )));
        }
        let byte_len = (bit_len + 7) / 8;
        if data.len() < byte_len {
            return Err(CodecError::MalformedCell(format!(
                "{} data bytes cannot hold {} bits",
                data.len(),
                bit_len
            )));
        }
        data.truncate(byte_len);
        if bit_len % 8 != 0 {
            if let Some(last) = data.last_mut() {
                *last &= 0xffu8 << (8 - bit_len % 8);
            }
        }

        Ok(Self {
            data,
            bit_len,
            refs,
        })
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    /// Start a bounds-checked read over this cell
    pub fn parse(&self) -> CellSlice<'_> {
        CellSlice::new(self)
    }

    /// Decode a single-root bag of cells
    pub fn from_boc(bytes: &[u8]) -> Result<Arc<Cell>, CodecError> {
        let mut roots = parse_boc(bytes)?;
        if roots.len() != 1 {
            return Err(CodecError::InvalidBoc(format!(
                "expected exactly one root, found {}",
                roots.len()
            )));
        }
        Ok(roots.remove(0))
    }

    /// Decode a base64-encoded single-root bag of cells
    pub fn from_boc_base64(encoded: &str) -> Result<Arc<Cell>, CodecError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CodecError::InvalidBoc(format!("invalid base64: {}", e)))?;
        Self::from_boc(&bytes)
    }

    pub fn to_boc(&self) -> Vec<u8> {
        serialize_boc(self)
    }

    pub fn to_boc_base64(&self) -> String {
        STANDARD.encode(self.to_boc())
    }
}
