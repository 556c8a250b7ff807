//! Message op-codes and exit codes of the storage contracts

/// Inbound op of the bag contract that creates a storage order contract
pub const OP_PLACE_STORAGE_ORDER: u32 = 0xa805_5863;
pub const OP_REGISTER_AS_STORAGE_PROVIDER: u32 = 0x12ca_6ea8;
pub const OP_SUBMIT_STORAGE_PROOF: u32 = 0x48f5_48ce;
pub const OP_CLAIM_STORAGE_REWARDS: u32 = 0x0a6b_5d0d;

/// Compute phase exit code of a successful transaction
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code recorded when a transaction has no VM compute phase
pub const EXIT_NO_COMPUTE_PHASE: i32 = -1;

/// Stored op-code for messages without a body or with a zero op
pub const OP_NONE: &str = "none";

/// Format an inbound op-code the way it is persisted: lowercase hex without prefix
pub fn format_op(op: Option<u32>) -> String {
    match op {
        Some(op) if op != 0 => format!("{:x}", op),
        _ => OP_NONE.to_string(),
    }
}

/// Whether a transaction placed a new storage order
pub fn is_order_placement(op_code: &str, exit_code: i32) -> bool {
    op_code == format_op(Some(OP_PLACE_STORAGE_ORDER)) && exit_code == EXIT_SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_op() {
        assert_eq!(format_op(Some(OP_PLACE_STORAGE_ORDER)), "a8055863");
        assert_eq!(format_op(Some(0x0a6b5d0d)), "a6b5d0d");
        assert_eq!(format_op(Some(0)), OP_NONE);
        assert_eq!(format_op(None), OP_NONE);
    }

    #[test]
    fn test_order_placement_flag() {
        let place = format_op(Some(OP_PLACE_STORAGE_ORDER));
        assert!(is_order_placement(&place, EXIT_SUCCESS));
        assert!(!is_order_placement(&place, 37));
        assert!(!is_order_placement(&place, EXIT_NO_COMPUTE_PHASE));

        let register = format_op(Some(OP_REGISTER_AS_STORAGE_PROVIDER));
        assert!(!is_order_placement(&register, EXIT_SUCCESS));
        assert!(!is_order_placement(OP_NONE, EXIT_SUCCESS));
    }
}
