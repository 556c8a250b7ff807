use std::sync::Arc;

use super::{Address, Cell, CodecError, MAX_CELL_BITS, MAX_CELL_REFS};

/// Writer for one cell, capped at the cell capacity
#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    fn ensure_capacity(&self, bits: usize) -> Result<(), CodecError> {
        if self.bit_len + bits > MAX_CELL_BITS {
            return Err(CodecError::CellOverflow(format!(
                "cannot store {} bits, {} of {} already used",
                bits, self.bit_len, MAX_CELL_BITS
            )));
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let index = self.data.len() - 1;
            self.data[index] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self, CodecError> {
        self.ensure_capacity(1)?;
        self.push_bit(bit);
        Ok(self)
    }

    /// Store the low `bits` bits of `value`, big-endian
    pub fn store_u128(&mut self, value: u128, bits: usize) -> Result<&mut Self, CodecError> {
        if bits > 128 || (bits < 128 && value >> bits != 0) {
            return Err(CodecError::CellOverflow(format!(
                "value {} does not fit in {} bits",
                value, bits
            )));
        }
        self.ensure_capacity(bits)?;
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
        Ok(self)
    }

    pub fn store_uint(&mut self, value: u64, bits: usize) -> Result<&mut Self, CodecError> {
        if bits > 64 {
            return Err(CodecError::CellOverflow(format!(
                "cannot store a 64-bit integer in {} bits",
                bits
            )));
        }
        self.store_u128(u128::from(value), bits)
    }

    /// Store a two's complement signed integer
    pub fn store_int(&mut self, value: i64, bits: usize) -> Result<&mut Self, CodecError> {
        if bits == 0 || bits > 64 {
            return Err(CodecError::CellOverflow(format!(
                "cannot store a signed integer in {} bits",
                bits
            )));
        }
        if bits < 64 {
            let min = -(1i64 << (bits - 1));
            let max = (1i64 << (bits - 1)) - 1;
            if value < min || value > max {
                return Err(CodecError::CellOverflow(format!(
                    "value {} does not fit in {} signed bits",
                    value, bits
                )));
            }
        }
        let raw = if bits == 64 {
            value as u64
        } else {
            (value as u64) & ((1u64 << bits) - 1)
        };
        self.store_uint(raw, bits)
    }

    pub fn store_hash256(&mut self, hash: &[u8; 32]) -> Result<&mut Self, CodecError> {
        self.ensure_capacity(256)?;
        for byte in hash {
            self.store_uint(u64::from(*byte), 8)?;
        }
        Ok(self)
    }

    /// Store `VarUInteger 16`
    pub fn store_coins(&mut self, amount: u128) -> Result<&mut Self, CodecError> {
        let byte_len = (128 - amount.leading_zeros() as usize + 7) / 8;
        if byte_len > 15 {
            return Err(CodecError::CellOverflow(format!(
                "coin amount {} needs {} bytes",
                amount, byte_len
            )));
        }
        self.ensure_capacity(4 + byte_len * 8)?;
        self.store_uint(byte_len as u64, 4)?;
        self.store_u128(amount, byte_len * 8)
    }

    /// Store `addr_std` or `addr_none`
    pub fn store_address(&mut self, address: Option<&Address>) -> Result<&mut Self, CodecError> {
        match address {
            None => self.store_uint(0, 2),
            Some(address) => {
                self.ensure_capacity(267)?;
                self.store_uint(0b10, 2)?;
                self.store_bit(false)?;
                self.store_int(i64::from(address.workchain()), 8)?;
                self.store_hash256(address.hash())
            }
        }
    }

    /// Append raw bits taken from the front of `data`
    pub fn store_bits(&mut self, data: &[u8], bits: usize) -> Result<&mut Self, CodecError> {
        if data.len() * 8 < bits {
            return Err(CodecError::MalformedCell(format!(
                "{} bytes cannot supply {} bits",
                data.len(),
                bits
            )));
        }
        self.ensure_capacity(bits)?;
        for i in 0..bits {
            self.push_bit((data[i / 8] >> (7 - i % 8)) & 1 == 1);
        }
        Ok(self)
    }

    pub fn store_ref(&mut self, cell: Arc<Cell>) -> Result<&mut Self, CodecError> {
        if self.refs.len() >= MAX_CELL_REFS {
            return Err(CodecError::CellOverflow(format!(
                "cell already holds {} references",
                MAX_CELL_REFS
            )));
        }
        self.refs.push(cell);
        Ok(self)
    }

    pub fn build(&self) -> Result<Arc<Cell>, CodecError> {
        Ok(Arc::new(Cell::new(
            self.data.clone(),
            self.bit_len,
            self.refs.clone(),
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_capacity() {
        let mut builder = CellBuilder::new();
        for _ in 0..15 {
            builder.store_uint(u64::MAX, 64).unwrap();
        }
        builder.store_uint(0, 63).unwrap();
        assert_eq!(builder.bit_len(), MAX_CELL_BITS);
        assert!(matches!(
            builder.store_bit(true),
            Err(CodecError::CellOverflow(_))
        ));
    }

    #[test]
    fn test_ref_capacity() {
        let child = CellBuilder::new().build().unwrap();
        let mut builder = CellBuilder::new();
        for _ in 0..MAX_CELL_REFS {
            builder.store_ref(child.clone()).unwrap();
        }
        assert!(matches!(
            builder.store_ref(child),
            Err(CodecError::CellOverflow(_))
        ));
    }

    #[test]
    fn test_value_must_fit_width() {
        let mut builder = CellBuilder::new();
        assert!(builder.store_uint(8, 3).is_err());
        assert!(builder.store_int(128, 8).is_err());
        assert!(builder.store_int(-129, 8).is_err());
        assert_eq!(builder.bit_len(), 0);
    }

    #[test]
    fn test_bits_are_packed_msb_first() {
        let mut builder = CellBuilder::new();
        builder
            .store_bit(true)
            .unwrap()
            .store_uint(0b0101, 4)
            .unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 5);
        assert_eq!(cell.data(), &[0b1010_1000]);
    }
}
