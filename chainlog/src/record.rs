//! Display-ready transfer records.

use alloy::primitives::{Address, U256};
use chrono::DateTime;
use serde::Serialize;

use crate::contract::RawRecord;
use crate::units::amount_to_f64;

/// A transfer record as shown to the user.
///
/// Built once from a [`RawRecord`] and never mutated; refreshes replace the
/// whole list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Account that appended the record.
    pub address_from: Address,
    /// Receiver of the transfer.
    pub address_to: Address,
    /// Human-readable timestamp.
    pub timestamp: String,
    /// Raw block timestamp (seconds).
    pub timestamp_secs: u64,
    /// Free-form message.
    pub message: String,
    /// Keyword.
    pub keyword: String,
    /// Amount in ether.
    pub amount: f64,
    /// Amount in wei.
    pub amount_wei: U256,
}

impl TransactionRecord {
    /// Convert a chain record.
    #[must_use]
    pub fn from_raw(raw: &RawRecord) -> Self {
        Self {
            address_from: raw.sender,
            address_to: raw.receiver,
            timestamp: format_timestamp(raw.timestamp),
            timestamp_secs: raw.timestamp,
            message: raw.message.clone(),
            keyword: raw.keyword.clone(),
            amount: amount_to_f64(raw.amount),
            amount_wei: raw.amount,
        }
    }
}

impl From<&RawRecord> for TransactionRecord {
    fn from(raw: &RawRecord) -> Self {
        Self::from_raw(raw)
    }
}

/// Map chain records in order. No sorting is applied.
#[must_use]
pub fn map_records(raw: &[RawRecord]) -> Vec<TransactionRecord> {
    raw.iter().map(TransactionRecord::from_raw).collect()
}

/// Render seconds since the epoch as `YYYY-MM-DD HH:MM:SS UTC`.
#[must_use]
pub fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .map_or_else(
            || secs.to_string(),
            |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn raw(amount: u128, message: &str) -> RawRecord {
        RawRecord {
            sender: address!("0x1111111111111111111111111111111111111111"),
            receiver: address!("0x2222222222222222222222222222222222222222"),
            amount: U256::from(amount),
            message: message.into(),
            timestamp: 1_700_000_000,
            keyword: "coffee".into(),
        }
    }

    #[test]
    fn test_amounts_and_order() {
        let records = map_records(&[
            raw(2_000_000_000_000_000_000, "first"),
            raw(500_000_000_000_000_000, "second"),
        ]);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, "first");
        assert!((records[0].amount - 2.0).abs() < f64::EPSILON);
        assert_eq!(records[1].message, "second");
        assert!((records[1].amount - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_field_mapping() {
        let source = raw(1, "hi");
        let record = TransactionRecord::from(&source);
        assert_eq!(record.address_from, source.sender);
        assert_eq!(record.address_to, source.receiver);
        assert_eq!(record.keyword, "coffee");
        assert_eq!(record.amount_wei, U256::from(1));
        assert_eq!(record.timestamp, "2023-11-14 22:13:20 UTC");
    }

    #[test]
    fn test_out_of_range_timestamp() {
        assert_eq!(format_timestamp(u64::MAX), u64::MAX.to_string());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(TransactionRecord::from_raw(&raw(1, "x"))).unwrap();
        assert!(json.get("addressFrom").is_some());
        assert!(json.get("timestampSecs").is_some());
    }
}
