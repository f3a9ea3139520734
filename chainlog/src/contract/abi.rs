//! ABI of the transfer log contract.
#![allow(missing_docs, dead_code)]

use super::RawRecord;

alloy::sol! {
    #[sol(rpc)]
    contract Transactions {
        struct TransferStruct {
            address sender;
            address receiver;
            uint amount;
            string message;
            uint256 timestamp;
            string keyword;
        }

        function addToBlockchain(address payable receiver, uint amount, string memory message, string memory keyword) public;
        function getAllTransactions() public view returns (TransferStruct[] memory);
        function getTransactionCount() public view returns (uint256);
    }
}

impl From<Transactions::TransferStruct> for RawRecord {
    fn from(raw: Transactions::TransferStruct) -> Self {
        Self {
            sender: raw.sender,
            receiver: raw.receiver,
            amount: raw.amount,
            message: raw.message,
            timestamp: raw.timestamp.saturating_to(),
            keyword: raw.keyword,
        }
    }
}
