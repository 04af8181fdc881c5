//! Store key layout
//!
//! One key per singleton record, plus `event:{instant}` for scheduled lists.
//! Instants are zero-padded to 20 digits so byte order equals time order.

pub const GLOBAL_META_KEY: &[u8] = b"global_meta";
pub const INFLATION_POOLS_KEY: &[u8] = b"inflation_pools";
pub const ALLOCATION_KEY: &[u8] = b"global_allocation";
pub const CONSUMPTION_META_KEY: &[u8] = b"consumption_meta";
pub const CONGESTION_KEY: &[u8] = b"congestion";
pub const VALUATION_PARAMS_KEY: &[u8] = b"valuation_params";
pub const BLOCK_CLOCK_KEY: &[u8] = b"block_clock";

pub const EVENT_PREFIX: &[u8] = b"event:";

/// Singleton records in the order they are hashed
pub const RECORD_KEYS: [&[u8]; 7] = [
    GLOBAL_META_KEY,
    INFLATION_POOLS_KEY,
    ALLOCATION_KEY,
    CONSUMPTION_META_KEY,
    CONGESTION_KEY,
    VALUATION_PARAMS_KEY,
    BLOCK_CLOCK_KEY,
];

/// Callers must pass a non-negative instant
pub fn event_key(instant: i64) -> Vec<u8> {
    format!("event:{:020}", instant).into_bytes()
}

pub fn parse_event_key(key: &[u8]) -> Option<i64> {
    let digits = key.strip_prefix(EVENT_PREFIX)?;
    if digits.len() != 20 {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}
