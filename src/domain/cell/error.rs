use thiserror::Error;

/// Errors raised while reading or writing cells
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A read asked for more bits or references than the cell holds,
    /// or the cell content does not match the expected layout
    #[error("malformed cell: {0}")]
    MalformedCell(String),

    /// A write would exceed the 1023 bit / 4 reference capacity of a cell
    #[error("cell overflow: {0}")]
    CellOverflow(String),

    /// The bag-of-cells envelope is invalid
    #[error("invalid bag of cells: {0}")]
    InvalidBoc(String),

    /// Address string or address field could not be decoded
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}
