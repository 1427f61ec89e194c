use std::sync::Mutex;

use async_trait::async_trait;
use time::macros::datetime;

use crate::{
    Error,
    api::{BatchResult, TransactionApi},
    transaction::{NewTransaction, Transaction, TransactionId},
};

/// Amounts at or above this are classified as fraud by [FakeApi].
pub(crate) const FAKE_FRAUD_THRESHOLD: f64 = 1000.0;

/// An in-memory stand-in for the scoring API that records what it was sent.
#[derive(Debug, Default)]
pub(crate) struct FakeApi {
    pub transactions: Vec<Transaction>,
    pub similar: Vec<Transaction>,
    pub fail_fetch: bool,
    /// The zero-based index of the batch call that should fail.
    pub fail_batch: Option<usize>,
    pub batch_calls: Mutex<Vec<Vec<NewTransaction>>>,
    pub processed: Mutex<Vec<NewTransaction>>,
    /// Answer submissions with an empty body instead of the scored transaction.
    pub process_without_body: bool,
}

impl FakeApi {
    pub(crate) fn with_transactions(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            ..Default::default()
        }
    }

    pub(crate) fn batch_sizes(&self) -> Vec<usize> {
        self.batch_calls
            .lock()
            .unwrap()
            .iter()
            .map(|batch| batch.len())
            .collect()
    }

    pub(crate) fn processed(&self) -> Vec<NewTransaction> {
        self.processed.lock().unwrap().clone()
    }
}

fn connection_reset() -> Error {
    Error::Transport("connection reset by peer".to_owned())
}

#[async_trait]
impl TransactionApi for FakeApi {
    async fn fetch_all(&self) -> Result<Vec<Transaction>, Error> {
        if self.fail_fetch {
            return Err(connection_reset());
        }

        Ok(self.transactions.clone())
    }

    async fn process(&self, transaction: &NewTransaction) -> Result<Option<Transaction>, Error> {
        let mut processed = self.processed.lock().unwrap();
        processed.push(transaction.clone());

        if self.process_without_body {
            return Ok(None);
        }

        Ok(Some(Transaction {
            id: TransactionId::new(100 + processed.len() as i64),
            amount: transaction.amount,
            time: transaction.time,
            location: transaction.location.clone(),
            device: transaction.device.clone(),
            is_fraud: transaction.amount >= FAKE_FRAUD_THRESHOLD,
            anomaly_score: if transaction.amount >= FAKE_FRAUD_THRESHOLD {
                -0.8
            } else {
                0.1
            },
        }))
    }

    async fn similar(&self, _id: TransactionId) -> Result<Vec<Transaction>, Error> {
        Ok(self.similar.clone())
    }

    async fn submit_batch(&self, transactions: &[NewTransaction]) -> Result<BatchResult, Error> {
        let mut calls = self.batch_calls.lock().unwrap();
        let index = calls.len();
        calls.push(transactions.to_vec());

        if self.fail_batch == Some(index) {
            return Err(connection_reset());
        }

        let fraudulent = transactions
            .iter()
            .filter(|transaction| transaction.amount >= FAKE_FRAUD_THRESHOLD)
            .count();

        Ok(BatchResult {
            successful: transactions.len(),
            failed: 0,
            fraudulent,
        })
    }
}

/// A new transaction on 2024-03-01 from Auckland.
pub(crate) fn new_transaction(amount: f64) -> NewTransaction {
    NewTransaction {
        amount,
        location: "Auckland".to_owned(),
        device: "iPhone".to_owned(),
        time: datetime!(2024-03-01 12:00 UTC),
    }
}
