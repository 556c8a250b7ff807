use std::collections::BTreeMap;
use std::sync::Arc;

use super::{Cell, CellBuilder, CellSlice, CodecError};

/// Dictionary key: an unsigned big-endian integer of up to 256 bits,
/// right-aligned in 32 bytes.
pub type DictKey = [u8; 32];

/// Decoded `HashmapE n ^Cell`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    key_bits: usize,
    entries: BTreeMap<DictKey, Arc<Cell>>,
}

impl Dictionary {
    pub fn new(key_bits: usize) -> Self {
        Self {
            key_bits,
            entries: BTreeMap::new(),
        }
    }

    pub fn key_bits(&self) -> usize {
        self.key_bits
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &DictKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &DictKey) -> Option<&Arc<Cell>> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: DictKey, value: Arc<Cell>) -> Option<Arc<Cell>> {
        self.entries.insert(key, value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DictKey, &Arc<Cell>)> {
        self.entries.iter()
    }

    fn key_bit(&self, key: &DictKey, index: usize) -> bool {
        let pos = 256 - self.key_bits + index;
        (key[pos / 8] >> (7 - pos % 8)) & 1 == 1
    }
}

/// Number of bits used to store a label length bounded by `max`
fn len_bits(max: usize) -> usize {
    (usize::BITS - max.leading_zeros()) as usize
}

/// Read a `HashmapE key_bits ^Cell` from the cursor
pub fn load_dict(slice: &mut CellSlice<'_>, key_bits: usize) -> Result<Dictionary, CodecError> {
    if key_bits == 0 || key_bits > 256 {
        return Err(CodecError::MalformedCell(format!(
            "unsupported dictionary key width {}",
            key_bits
        )));
    }
    let mut dict = Dictionary::new(key_bits);
    if slice.load_bit()? {
        let root = slice.load_ref()?;
        let mut prefix = Vec::with_capacity(key_bits);
        load_node(root, key_bits, &mut prefix, &mut dict)?;
    }
    Ok(dict)
}

fn load_node(
    cell: &Cell,
    remaining: usize,
    prefix: &mut Vec<bool>,
    dict: &mut Dictionary,
) -> Result<(), CodecError> {
    let start = prefix.len();
    let mut slice = cell.parse();
    let label_len = load_label(&mut slice, remaining, prefix)?;

    if label_len == remaining {
        let value = slice.load_ref()?.clone();
        dict.insert(key_from_bits(prefix, dict.key_bits), value);
    } else {
        let left = slice.load_ref()?;
        let right = slice.load_ref()?;
        let child_remaining = remaining - label_len - 1;
        for (bit, child) in [(false, left), (true, right)] {
            prefix.push(bit);
            load_node(child, child_remaining, prefix, dict)?;
            prefix.pop();
        }
    }

    prefix.truncate(start);
    Ok(())
}

/// Read an `HmLabel ~l max` and append its bits to `prefix`
fn load_label(
    slice: &mut CellSlice<'_>,
    max: usize,
    prefix: &mut Vec<bool>,
) -> Result<usize, CodecError> {
    let len = if !slice.load_bit()? {
        // hml_short: unary length, then the bits
        let mut len = 0;
        while slice.load_bit()? {
            len += 1;
        }
        check_label_len(len, max)?;
        for _ in 0..len {
            prefix.push(slice.load_bit()?);
        }
        len
    } else if !slice.load_bit()? {
        // hml_long
        let len = slice.load_uint(len_bits(max))? as usize;
        check_label_len(len, max)?;
        for _ in 0..len {
            prefix.push(slice.load_bit()?);
        }
        len
    } else {
        // hml_same
        let bit = slice.load_bit()?;
        let len = slice.load_uint(len_bits(max))? as usize;
        check_label_len(len, max)?;
        prefix.extend(std::iter::repeat(bit).take(len));
        len
    };
    Ok(len)
}

fn check_label_len(len: usize, max: usize) -> Result<(), CodecError> {
    if len > max {
        return Err(CodecError::MalformedCell(format!(
            "dictionary label of {} bits exceeds remaining key width {}",
            len, max
        )));
    }
    Ok(())
}

fn key_from_bits(bits: &[bool], key_bits: usize) -> DictKey {
    let mut key = [0u8; 32];
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            let pos = 256 - key_bits + i;
            key[pos / 8] |= 0x80 >> (pos % 8);
        }
    }
    key
}

/// Write `dict` as a `HashmapE`, using long labels throughout
pub fn store_dict(builder: &mut CellBuilder, dict: &Dictionary) -> Result<(), CodecError> {
    if dict.is_empty() {
        builder.store_bit(false)?;
        return Ok(());
    }
    let items: Vec<(&DictKey, &Arc<Cell>)> = dict.iter().collect();
    let root = store_node(dict, &items, 0, dict.key_bits)?;
    builder.store_bit(true)?.store_ref(root)?;
    Ok(())
}

fn store_node(
    dict: &Dictionary,
    items: &[(&DictKey, &Arc<Cell>)],
    offset: usize,
    remaining: usize,
) -> Result<Arc<Cell>, CodecError> {
    let (first_key, _) = items[0];
    let (last_key, _) = items[items.len() - 1];

    // keys are sorted, so the first and last bound the common prefix
    let mut label_len = 0;
    while label_len < remaining
        && dict.key_bit(first_key, offset + label_len) == dict.key_bit(last_key, offset + label_len)
    {
        label_len += 1;
    }

    let mut builder = CellBuilder::new();
    builder
        .store_bit(true)?
        .store_bit(false)?
        .store_uint(label_len as u64, len_bits(remaining))?;
    for i in 0..label_len {
        builder.store_bit(dict.key_bit(first_key, offset + i))?;
    }

    if label_len == remaining {
        let (_, value) = items[0];
        builder.store_ref((*value).clone())?;
    } else {
        let split_at = offset + label_len;
        let split = items
            .iter()
            .position(|(key, _)| dict.key_bit(key, split_at))
            .unwrap_or(items.len());
        let child_remaining = remaining - label_len - 1;
        let left = store_node(dict, &items[..split], split_at + 1, child_remaining)?;
        let right = store_node(dict, &items[split..], split_at + 1, child_remaining)?;
        builder.store_ref(left)?.store_ref(right)?;
    }

    builder.build()
}
