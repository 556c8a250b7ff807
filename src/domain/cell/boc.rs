use std::collections::VecDeque;
use std::sync::Arc;

use super::{Cell, CodecError};

const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

const FLAG_HAS_INDEX: u8 = 0x80;
const FLAG_HAS_CRC: u8 = 0x40;
const SIZE_MASK: u8 = 0x07;

const D1_EXOTIC: u8 = 0x08;
const D1_WITH_HASHES: u8 = 0x10;
const D1_REFS_MASK: u8 = 0x07;

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                CodecError::InvalidBoc(format!(
                    "unexpected end of data: need {} bytes at offset {}, have {}",
                    len,
                    self.pos,
                    self.bytes.len()
                ))
            })?;
        let chunk = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(chunk)
    }

    fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn read_uint(&mut self, len: usize) -> Result<u64, CodecError> {
        Ok(self
            .take(len)?
            .iter()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)))
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

struct RawCell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<usize>,
}

/// Parse a bag of cells, returning its root cells in order
pub fn parse_boc(bytes: &[u8]) -> Result<Vec<Arc<Cell>>, CodecError> {
    let mut reader = ByteReader::new(bytes);

    if reader.take(4)? != BOC_MAGIC {
        return Err(CodecError::InvalidBoc("unknown magic prefix".to_string()));
    }

    let flags = reader.read_u8()?;
    let has_index = flags & FLAG_HAS_INDEX != 0;
    let has_crc = flags & FLAG_HAS_CRC != 0;
    let size = (flags & SIZE_MASK) as usize;
    if size == 0 || size > 4 {
        return Err(CodecError::InvalidBoc(format!("invalid reference size {}", size)));
    }

    let offset_size = reader.read_u8()? as usize;
    if offset_size == 0 || offset_size > 8 {
        return Err(CodecError::InvalidBoc(format!(
            "invalid offset size {}",
            offset_size
        )));
    }

    let cell_count = reader.read_uint(size)? as usize;
    let root_count = reader.read_uint(size)? as usize;
    let absent_count = reader.read_uint(size)?;
    let total_cells_size = reader.read_uint(offset_size)? as usize;

    if absent_count != 0 {
        return Err(CodecError::InvalidBoc(
            "absent cells are not supported".to_string(),
        ));
    }
    if root_count == 0 || root_count > cell_count {
        return Err(CodecError::InvalidBoc(format!(
            "{} roots declared for {} cells",
            root_count, cell_count
        )));
    }

    let mut root_indexes = Vec::with_capacity(root_count);
    for _ in 0..root_count {
        let index = reader.read_uint(size)? as usize;
        if index >= cell_count {
            return Err(CodecError::InvalidBoc(format!(
                "root index {} out of range",
                index
            )));
        }
        root_indexes.push(index);
    }

    if has_index {
        let index_len = cell_count.checked_mul(offset_size).ok_or_else(|| {
            CodecError::InvalidBoc("cell index size overflows".to_string())
        })?;
        reader.take(index_len)?;
    }

    let cells_start = reader.position();
    // every cell needs at least its two descriptor bytes
    if cell_count > reader.remaining() / 2 {
        return Err(CodecError::InvalidBoc(format!(
            "{} cells cannot fit in {} bytes",
            cell_count,
            reader.remaining()
        )));
    }
    let mut raw_cells = Vec::with_capacity(cell_count);
    for index in 0..cell_count {
        raw_cells.push(read_cell(&mut reader, index, cell_count, size)?);
    }
    if reader.position() - cells_start != total_cells_size {
        return Err(CodecError::InvalidBoc(format!(
            "cell data occupies {} bytes, header declares {}",
            reader.position() - cells_start,
            total_cells_size
        )));
    }

    if has_crc {
        let covered = reader.position();
        let trailer = reader.take(4)?;
        let expected = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let actual = crc32c::crc32c(&bytes[..covered]);
        if actual != expected {
            return Err(CodecError::InvalidBoc(format!(
                "crc32c mismatch: trailer {:08x}, computed {:08x}",
                expected, actual
            )));
        }
    }
    if reader.remaining() != 0 {
        return Err(CodecError::InvalidBoc(format!(
            "{} trailing bytes",
            reader.remaining()
        )));
    }

    // references point forward, so building back to front sees children first
    let mut built: Vec<Option<Arc<Cell>>> = vec![None; cell_count];
    for index in (0..cell_count).rev() {
        let raw = &raw_cells[index];
        let mut refs = Vec::with_capacity(raw.refs.len());
        for child in &raw.refs {
            let cell = built[*child].clone().ok_or_else(|| {
                CodecError::InvalidBoc(format!("cell {} references unbuilt cell {}", index, child))
            })?;
            refs.push(cell);
        }
        built[index] = Some(Arc::new(Cell::new(raw.data.clone(), raw.bit_len, refs)?));
    }

    root_indexes
        .into_iter()
        .map(|index| {
            built[index]
                .clone()
                .ok_or_else(|| CodecError::InvalidBoc(format!("root {} was not built", index)))
        })
        .collect()
}

fn read_cell(
    reader: &mut ByteReader<'_>,
    index: usize,
    cell_count: usize,
    size: usize,
) -> Result<RawCell, CodecError> {
    let d1 = reader.read_u8()?;
    let d2 = reader.read_u8()?;

    if d1 & D1_EXOTIC != 0 {
        return Err(CodecError::InvalidBoc(format!(
            "cell {} is exotic, only ordinary cells are supported",
            index
        )));
    }
    let ref_count = (d1 & D1_REFS_MASK) as usize;
    if ref_count > 4 {
        return Err(CodecError::InvalidBoc(format!(
            "cell {} declares {} references",
            index, ref_count
        )));
    }
    if d1 & D1_WITH_HASHES != 0 {
        let level_mask = d1 >> 5;
        let hash_count = level_mask.count_ones() as usize + 1;
        reader.take(hash_count * (32 + 2))?;
    }

    let data_len = (d2 as usize + 1) / 2;
    let padded = d2 % 2 == 1;
    let mut data = reader.take(data_len)?.to_vec();
    let bit_len = if padded {
        let last = data.last().copied().unwrap_or(0);
        if last == 0 {
            return Err(CodecError::InvalidBoc(format!(
                "cell {} is missing its completion tag",
                index
            )));
        }
        let tag_pos = last.trailing_zeros() as usize;
        if let Some(byte) = data.last_mut() {
            *byte &= !(1u8 << tag_pos);
        }
        (data_len - 1) * 8 + (7 - tag_pos)
    } else {
        data_len * 8
    };

    let mut refs = Vec::with_capacity(ref_count);
    for _ in 0..ref_count {
        let child = reader.read_uint(size)? as usize;
        if child <= index || child >= cell_count {
            return Err(CodecError::InvalidBoc(format!(
                "cell {} has a non-forward reference to {}",
                index, child
            )));
        }
        refs.push(child);
    }

    Ok(RawCell {
        data,
        bit_len,
        refs,
    })
}

/// Serialize a single-root cell tree without index or checksum.
///
/// Cells are numbered breadth-first, so every reference points forward.
/// Shared subtrees are written once per occurrence.
pub fn serialize_boc(root: &Cell) -> Vec<u8> {
    let mut order: Vec<&Cell> = Vec::new();
    let mut child_indexes: Vec<Vec<usize>> = Vec::new();
    let mut queue: VecDeque<&Cell> = VecDeque::new();
    queue.push_back(root);
    let mut next_index = 1;

    while let Some(cell) = queue.pop_front() {
        let mut children = Vec::with_capacity(cell.refs().len());
        for child in cell.refs() {
            children.push(next_index);
            next_index += 1;
            queue.push_back(child.as_ref());
        }
        order.push(cell);
        child_indexes.push(children);
    }

    let cell_count = order.len();
    let size = bytes_needed(cell_count as u64);

    let mut cell_data = Vec::new();
    for (cell, children) in order.iter().zip(&child_indexes) {
        let full_bytes = cell.bit_len() / 8;
        let data_len = (cell.bit_len() + 7) / 8;
        cell_data.push(cell.refs().len() as u8);
        cell_data.push((full_bytes + data_len) as u8);
        let mut data = cell.data()[..data_len].to_vec();
        if cell.bit_len() % 8 != 0 {
            if let Some(last) = data.last_mut() {
                *last |= 0x80 >> (cell.bit_len() % 8);
            }
        }
        cell_data.extend_from_slice(&data);
        for child in children {
            push_uint(&mut cell_data, *child as u64, size);
        }
    }

    let offset_size = bytes_needed(cell_data.len() as u64);

    let mut out = Vec::with_capacity(cell_data.len() + 16);
    out.extend_from_slice(&BOC_MAGIC);
    out.push(size as u8);
    out.push(offset_size as u8);
    push_uint(&mut out, cell_count as u64, size);
    push_uint(&mut out, 1, size);
    push_uint(&mut out, 0, size);
    push_uint(&mut out, cell_data.len() as u64, offset_size);
    push_uint(&mut out, 0, size);
    out.extend_from_slice(&cell_data);
    out
}

fn bytes_needed(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    ((bits + 7) / 8).max(1)
}

fn push_uint(out: &mut Vec<u8>, value: u64, len: usize) {
    for i in (0..len).rev() {
        out.push((value >> (i * 8)) as u8);
    }
}
