//! Session and UI-facing state.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::record::TransactionRecord;

/// Wallet connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Nothing checked yet.
    #[default]
    Idle,
    /// Looking for an already-authorized account.
    Checking,
    /// An account is active.
    Connected,
    /// No authorized account.
    Disconnected,
}

/// Submission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitState {
    /// No submission in progress.
    #[default]
    Idle,
    /// Sending the transfer and the record.
    Submitting,
    /// Waiting for the record transaction to be mined.
    AwaitingConfirmation,
}

/// Fields of the transfer form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    /// Receiver address.
    AddressTo,
    /// Decimal ether amount.
    Amount,
    /// Keyword.
    Keyword,
    /// Message.
    Message,
}

impl FormField {
    /// All fields, in form order.
    pub const ALL: [Self; 4] = [Self::AddressTo, Self::Amount, Self::Keyword, Self::Message];

    /// Field name as used by UI bindings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddressTo => "addressTo",
            Self::Amount => "amount",
            Self::Keyword => "keyword",
            Self::Message => "message",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| Error::conversion(format!("unknown form field: {s}")))
    }
}

/// The transfer form. All values are raw strings until submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormData {
    /// Receiver address.
    pub address_to: String,
    /// Decimal ether amount.
    pub amount: String,
    /// Keyword.
    pub keyword: String,
    /// Message.
    pub message: String,
}

impl FormData {
    /// Replace one field.
    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let slot = match field {
            FormField::AddressTo => &mut self.address_to,
            FormField::Amount => &mut self.amount,
            FormField::Keyword => &mut self.keyword,
            FormField::Message => &mut self.message,
        };
        *slot = value.into();
    }

    /// Read one field.
    #[must_use]
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::AddressTo => &self.address_to,
            FormField::Amount => &self.amount,
            FormField::Keyword => &self.keyword,
            FormField::Message => &self.message,
        }
    }
}

/// Everything a consuming UI reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Active account.
    pub current_account: Option<Address>,
    /// Connection state.
    pub connection: ConnectionState,
    /// A connection request is waiting on the user.
    pub connecting: bool,
    /// Transfer form.
    pub form_data: FormData,
    /// True while a submission awaits confirmation.
    pub is_loading: bool,
    /// Submission state.
    pub submit: SubmitState,
    /// Records in contract order.
    pub transactions: Vec<TransactionRecord>,
    /// Locally mirrored record count.
    pub transaction_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_field_by_field() {
        let mut form = FormData::default();
        form.set(FormField::Amount, "1.5");
        form.set(FormField::Keyword, "gift");
        assert_eq!(form.amount, "1.5");
        assert_eq!(form.get(FormField::Keyword), "gift");
        assert!(form.address_to.is_empty());

        form.set(FormField::Amount, "2");
        assert_eq!(form.get(FormField::Amount), "2");
    }

    #[test]
    fn test_form_field_names() {
        for field in FormField::ALL {
            assert_eq!(field.as_str().parse::<FormField>().unwrap(), field);
        }
        assert!("amountTo".parse::<FormField>().is_err());
    }

    #[test]
    fn test_default_snapshot() {
        let snapshot = Snapshot::default();
        assert_eq!(snapshot.connection, ConnectionState::Idle);
        assert_eq!(snapshot.submit, SubmitState::Idle);
        assert!(!snapshot.is_loading);
        assert!(snapshot.current_account.is_none());
    }
}
