//! The remote transaction scoring API.
//!
//! The dashboard never classifies transactions itself. Every transaction is
//! sent to, and read back from, the scoring service through [TransactionApi].

mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    transaction::{NewTransaction, Transaction, TransactionId},
};

pub use client::HttpTransactionApi;

/// Path of the endpoint that lists every scored transaction.
pub const ALL_TRANSACTIONS_PATH: &str = "/api/transactions/all";
/// Path of the endpoint that scores a single transaction.
pub const PROCESS_TRANSACTION_PATH: &str = "/api/transactions/process";
/// Path of the endpoint that lists transactions similar to `{id}`.
pub const SIMILAR_TRANSACTIONS_PATH: &str = "/api/transactions/similar/{id}";
/// Path of the endpoint that scores a batch of transactions.
pub const BATCH_PATH: &str = "/api/transactions/batch";

/// The tally the scoring API returns for one submitted batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// How many transactions were scored.
    #[serde(default)]
    pub successful: usize,
    /// How many transactions could not be scored.
    #[serde(default)]
    pub failed: usize,
    /// How many of the scored transactions were classified as fraud.
    #[serde(default)]
    pub fraudulent: usize,
}

/// The body of a batch submission.
#[derive(Debug, Serialize)]
pub(crate) struct BatchRequest<'a> {
    pub transactions: &'a [NewTransaction],
}

/// Operations offered by the remote scoring API.
#[async_trait]
pub trait TransactionApi: Send + Sync {
    /// Fetch every transaction the service has scored.
    async fn fetch_all(&self) -> Result<Vec<Transaction>, Error>;

    /// Submit one transaction for scoring.
    ///
    /// Any 2xx status is a success. The classified transaction is returned
    /// if the API sent it back in the response body.
    async fn process(&self, transaction: &NewTransaction) -> Result<Option<Transaction>, Error>;

    /// Fetch the transactions the service considers similar to `id`.
    async fn similar(&self, id: TransactionId) -> Result<Vec<Transaction>, Error>;

    /// Submit one chunk of a batch import.
    async fn submit_batch(&self, transactions: &[NewTransaction]) -> Result<BatchResult, Error>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use crate::transaction::NewTransaction;

    use super::{BatchRequest, BatchResult};

    #[test]
    fn batch_request_wraps_transactions() {
        let transactions = [NewTransaction {
            amount: 12.5,
            location: "Auckland".to_owned(),
            device: "Web".to_owned(),
            time: datetime!(2024-03-01 09:00 UTC),
        }];

        let body = serde_json::to_value(BatchRequest {
            transactions: &transactions,
        })
        .unwrap();

        assert_eq!(
            body,
            json!({
                "transactions": [{
                    "amount": 12.5,
                    "location": "Auckland",
                    "device": "Web",
                    "time": "2024-03-01T09:00:00Z"
                }]
            })
        );
    }

    #[test]
    fn batch_result_defaults_missing_counts() {
        let result: BatchResult = serde_json::from_value(json!({ "successful": 3 })).unwrap();

        assert_eq!(
            result,
            BatchResult {
                successful: 3,
                failed: 0,
                fraudulent: 0
            }
        );
    }
}
