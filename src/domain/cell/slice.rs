use std::sync::Arc;

use super::{Address, Cell, CodecError};

/// Sequential reader over one cell.
///
/// Tracks a bit offset and a reference index; every read checks the
/// remaining bits first and fails with `MalformedCell` when it is short.
#[derive(Debug, Clone)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_offset: usize,
    ref_offset: usize,
}

impl<'a> CellSlice<'a> {
    pub fn new(cell: &'a Cell) -> Self {
        Self {
            cell,
            bit_offset: 0,
            ref_offset: 0,
        }
    }

    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len() - self.bit_offset
    }

    pub fn remaining_refs(&self) -> usize {
        self.cell.refs().len() - self.ref_offset
    }

    fn ensure_bits(&self, requested: usize) -> Result<(), CodecError> {
        if requested > self.remaining_bits() {
            return Err(CodecError::MalformedCell(format!(
                "requested {} bits at offset {}, only {} remaining",
                requested,
                self.bit_offset,
                self.remaining_bits()
            )));
        }
        Ok(())
    }

    fn bit_at(&self, index: usize) -> bool {
        (self.cell.data()[index / 8] >> (7 - index % 8)) & 1 == 1
    }

    pub fn load_bit(&mut self) -> Result<bool, CodecError> {
        self.ensure_bits(1)?;
        let bit = self.bit_at(self.bit_offset);
        self.bit_offset += 1;
        Ok(bit)
    }

    pub fn skip_bits(&mut self, bits: usize) -> Result<(), CodecError> {
        self.ensure_bits(bits)?;
        self.bit_offset += bits;
        Ok(())
    }

    /// Read an unsigned big-endian integer of up to 128 bits
    pub fn load_u128(&mut self, bits: usize) -> Result<u128, CodecError> {
        if bits > 128 {
            return Err(CodecError::MalformedCell(format!(
                "cannot read {} bits into a 128-bit integer",
                bits
            )));
        }
        self.ensure_bits(bits)?;
        let mut value = 0u128;
        for i in 0..bits {
            value = (value << 1) | u128::from(self.bit_at(self.bit_offset + i));
        }
        self.bit_offset += bits;
        Ok(value)
    }

    /// Read an unsigned big-endian integer of up to 64 bits
    pub fn load_uint(&mut self, bits: usize) -> Result<u64, CodecError> {
        if bits > 64 {
            return Err(CodecError::MalformedCell(format!(
                "cannot read {} bits into a 64-bit integer",
                bits
            )));
        }
        Ok(self.load_u128(bits)? as u64)
    }

    /// Read a two's complement signed integer of up to 64 bits
    pub fn load_int(&mut self, bits: usize) -> Result<i64, CodecError> {
        let raw = self.load_uint(bits)?;
        if bits == 0 || bits == 64 {
            return Ok(raw as i64);
        }
        if (raw >> (bits - 1)) & 1 == 1 {
            Ok(raw as i64 - (1i64 << bits))
        } else {
            Ok(raw as i64)
        }
    }

    /// Read a 256-bit field (hashes, merkle roots) as big-endian bytes
    pub fn load_hash256(&mut self) -> Result<[u8; 32], CodecError> {
        self.ensure_bits(256)?;
        let mut out = [0u8; 32];
        for byte in out.iter_mut() {
            *byte = self.load_uint(8)? as u8;
        }
        Ok(out)
    }

    /// Read `VarUInteger 16` (a 4-bit byte length followed by the value)
    pub fn load_coins(&mut self) -> Result<u128, CodecError> {
        let len = self.load_uint(4)? as usize;
        self.load_u128(len * 8)
    }

    /// Read a `MsgAddress`; `addr_none` yields `None`.
    /// Only `addr_std` without anycast is accepted.
    pub fn load_address(&mut self) -> Result<Option<Address>, CodecError> {
        match self.load_uint(2)? {
            0 => Ok(None),
            2 => {
                if self.load_bit()? {
                    return Err(CodecError::MalformedCell(
                        "anycast addresses are not supported".to_string(),
                    ));
                }
                let workchain = self.load_int(8)? as i32;
                let hash = self.load_hash256()?;
                Ok(Some(Address::new(workchain, hash)))
            }
            tag => Err(CodecError::MalformedCell(format!(
                "unsupported address tag {:02b}",
                tag
            ))),
        }
    }

    pub fn load_ref(&mut self) -> Result<&'a Arc<Cell>, CodecError> {
        let cell: &'a Cell = self.cell;
        let child = cell.refs().get(self.ref_offset).ok_or_else(|| {
            CodecError::MalformedCell(format!(
                "requested reference {} of {}",
                self.ref_offset + 1,
                cell.refs().len()
            ))
        })?;
        self.ref_offset += 1;
        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::CellBuilder;

    #[test]
    fn test_reads_fail_instead_of_padding() {
        let mut builder = CellBuilder::new();
        builder.store_uint(0b101, 3).unwrap();
        let cell = builder.build().unwrap();

        let mut slice = cell.parse();
        assert!(matches!(
            slice.load_uint(4),
            Err(CodecError::MalformedCell(_))
        ));
        // a failed read leaves the cursor untouched
        assert_eq!(slice.load_uint(3).unwrap(), 0b101);
        assert!(slice.load_bit().is_err());
        assert!(slice.load_ref().is_err());
    }

    #[test]
    fn test_signed_and_coins() {
        let mut builder = CellBuilder::new();
        builder
            .store_int(-1, 8)
            .unwrap()
            .store_coins(1_500_000_000)
            .unwrap()
            .store_coins(0)
            .unwrap();
        let cell = builder.build().unwrap();

        let mut slice = cell.parse();
        assert_eq!(slice.load_int(8).unwrap(), -1);
        assert_eq!(slice.load_coins().unwrap(), 1_500_000_000);
        assert_eq!(slice.load_coins().unwrap(), 0);
        assert_eq!(slice.remaining_bits(), 0);
    }

    #[test]
    fn test_address_tags() {
        let address = Address::new(0, [7u8; 32]);
        let mut builder = CellBuilder::new();
        builder
            .store_address(Some(&address))
            .unwrap()
            .store_address(None)
            .unwrap()
            .store_uint(0b01, 2)
            .unwrap();
        let cell = builder.build().unwrap();

        let mut slice = cell.parse();
        assert_eq!(slice.load_address().unwrap(), Some(address));
        assert_eq!(slice.load_address().unwrap(), None);
        assert!(slice.load_address().is_err());
    }
}
