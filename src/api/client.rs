//! A [TransactionApi] backed by HTTP requests with reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::{
    Error,
    api::{
        ALL_TRANSACTIONS_PATH, BATCH_PATH, BatchRequest, BatchResult, PROCESS_TRANSACTION_PATH,
        SIMILAR_TRANSACTIONS_PATH, TransactionApi,
    },
    endpoints::format_endpoint,
    transaction::{NewTransaction, Transaction, TransactionId},
};

/// How long to wait for the scoring API before giving up on a request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Talks to the scoring API at `base_url`.
#[derive(Debug, Clone)]
pub struct HttpTransactionApi {
    client: Client,
    base_url: String,
}

impl HttpTransactionApi {
    /// Create a client for the API at `base_url`, e.g. "http://localhost:5000".
    ///
    /// # Errors
    /// Returns [Error::Transport] if the HTTP client cannot be initialised.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Like [HttpTransactionApi::new] with a custom request timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl TransactionApi for HttpTransactionApi {
    async fn fetch_all(&self) -> Result<Vec<Transaction>, Error> {
        let transactions = self
            .client
            .get(self.url(ALL_TRANSACTIONS_PATH))
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Transaction>>()
            .await?;

        tracing::debug!("Fetched {} transactions", transactions.len());

        Ok(transactions)
    }

    async fn process(&self, transaction: &NewTransaction) -> Result<Option<Transaction>, Error> {
        let body = self
            .client
            .post(self.url(PROCESS_TRANSACTION_PATH))
            .json(transaction)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        if body.iter().all(u8::is_ascii_whitespace) {
            tracing::debug!("Transaction processed, the response had no body");
            return Ok(None);
        }

        match serde_json::from_slice::<Transaction>(&body) {
            Ok(processed) => {
                tracing::debug!(
                    "Transaction {} processed, is_fraud={}",
                    processed.id,
                    processed.is_fraud
                );
                Ok(Some(processed))
            }
            Err(error) => {
                tracing::debug!(
                    "Transaction processed, the response body is not a transaction: {error}"
                );
                Ok(None)
            }
        }
    }

    async fn similar(&self, id: TransactionId) -> Result<Vec<Transaction>, Error> {
        let path = format_endpoint(SIMILAR_TRANSACTIONS_PATH, id);

        Ok(self
            .client
            .get(self.url(&path))
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Transaction>>()
            .await?)
    }

    async fn submit_batch(&self, transactions: &[NewTransaction]) -> Result<BatchResult, Error> {
        Ok(self
            .client
            .post(self.url(BATCH_PATH))
            .json(&BatchRequest { transactions })
            .send()
            .await?
            .error_for_status()?
            .json::<BatchResult>()
            .await?)
    }
}
