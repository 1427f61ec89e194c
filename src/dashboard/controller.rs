//! Orchestrates calls to the scoring API and folds the results into the
//! [DashboardStore].
//!
//! Each function awaits its request to completion before dispatching the
//! action that depends on it. The store lock is never held across an await.

use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    Error,
    api::TransactionApi,
    dashboard::state::{Action, DashboardStore, Selection},
    transaction::{NewTransaction, Transaction, TransactionId},
};

/// Fetch every transaction again and replace the master collection.
///
/// If a newer refresh is started while this one is in flight, the result of
/// this one is discarded.
///
/// # Errors
/// Returns the API error after recording it in the dashboard state. The
/// previously loaded transactions are kept.
pub async fn refresh_transactions(
    store: &DashboardStore,
    api: &dyn TransactionApi,
) -> Result<(), Error> {
    let request = store.begin_refresh()?;

    match api.fetch_all().await {
        Ok(transactions) => {
            tracing::info!("Loaded {} transactions", transactions.len());
            store.dispatch(Action::FetchSucceeded {
                request,
                transactions,
            })
        }
        Err(error) => {
            tracing::error!("Could not fetch transactions: {error}");
            store.dispatch(Action::FetchFailed {
                request,
                message: "Failed to fetch transactions".to_owned(),
            })?;
            Err(error)
        }
    }
}

/// Select the transaction `id` and load its similar transactions.
///
/// A failure to load the similar transactions is logged and gives an empty
/// history instead of an error.
///
/// # Errors
/// Returns [Error::NotFound] if `id` is not in the master collection.
pub async fn select_transaction(
    store: &DashboardStore,
    api: &dyn TransactionApi,
    id: TransactionId,
) -> Result<Selection, Error> {
    let transaction = store
        .read(|state| state.find(id).cloned())?
        .ok_or(Error::NotFound)?;

    store.dispatch(Action::TransactionClicked(transaction.clone()))?;

    let similar = match api.similar(id).await {
        Ok(similar) => {
            store.dispatch(Action::SimilarLoaded {
                id,
                transactions: similar.clone(),
            })?;
            similar
        }
        Err(error) => {
            tracing::error!("Could not fetch transactions similar to {id}: {error}");
            store.dispatch(Action::SimilarFailed {
                id,
                message: "Failed to load the transaction history".to_owned(),
            })?;
            Vec::new()
        }
    };

    Ok(Selection {
        transaction,
        similar,
        is_loading: false,
    })
}

/// Send a single transaction to the scoring API.
///
/// Returns the classified transaction if the API sent it back. Otherwise the
/// transaction reaches the dashboard through the live feed.
///
/// # Errors
/// Returns the API error after recording a notice in the dashboard state.
pub async fn submit_transaction(
    store: &DashboardStore,
    api: &dyn TransactionApi,
    transaction: &NewTransaction,
) -> Result<Option<Transaction>, Error> {
    match api.process(transaction).await {
        Ok(processed) => {
            match &processed {
                Some(processed) => tracing::info!(
                    "Transaction {} processed, is_fraud={}",
                    processed.id,
                    processed.is_fraud
                ),
                None => tracing::info!("Transaction processed without a classification"),
            }
            store.dispatch(Action::TransactionSubmitted(processed.clone()))?;
            Ok(processed)
        }
        Err(error) => {
            tracing::error!("Could not process transaction: {error}");
            store.dispatch(Action::SubmitFailed(
                "Failed to process transaction".to_owned(),
            ))?;
            Err(error)
        }
    }
}

/// Fold transactions from the live feed into the master collection until
/// the sending side is dropped.
pub async fn forward_live_transactions(
    store: DashboardStore,
    mut receiver: UnboundedReceiver<Transaction>,
) {
    while let Some(transaction) = receiver.recv().await {
        tracing::debug!("Live transaction {} received", transaction.id);

        if let Err(error) = store.dispatch(Action::LiveTransactionReceived(transaction)) {
            tracing::error!("Could not add live transaction: {error}");
        }
    }

    tracing::info!("Live transaction channel closed");
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use tokio::sync::mpsc;

    use crate::{
        Error,
        dashboard::state::{DashboardState, DashboardStore, NoticeKind},
        test_utils::FakeApi,
        transaction::{
            NewTransaction, TransactionId,
            test_utils::{fraudulent, transaction},
        },
    };

    use super::{
        forward_live_transactions, refresh_transactions, select_transaction, submit_transaction,
    };

    #[tokio::test]
    async fn refresh_loads_transactions() {
        let store = DashboardStore::default();
        let api = FakeApi::with_transactions(vec![transaction(1, 10.0), fraudulent(2, 20.0)]);

        refresh_transactions(&store, &api).await.unwrap();

        let (count, has_loaded) = store
            .read(|state| (state.transactions.len(), state.has_loaded))
            .unwrap();
        assert_eq!(count, 2);
        assert!(has_loaded);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_old_transactions() {
        let store =
            DashboardStore::new(DashboardState::with_transactions(vec![transaction(1, 10.0)]));
        let api = FakeApi {
            fail_fetch: true,
            ..Default::default()
        };

        let result = refresh_transactions(&store, &api).await;

        assert!(matches!(result, Err(Error::Transport(_))));
        let state = store.read(|state| state.clone()).unwrap();
        assert_eq!(state.transactions, vec![transaction(1, 10.0)]);
        assert!(!state.is_loading);
        assert_eq!(
            state.notice.unwrap().message,
            "Failed to fetch transactions"
        );
    }

    #[tokio::test]
    async fn select_loads_similar_transactions() {
        let store =
            DashboardStore::new(DashboardState::with_transactions(vec![transaction(1, 10.0)]));
        let api = FakeApi {
            similar: vec![transaction(8, 11.0), transaction(9, 12.0)],
            ..Default::default()
        };

        let selection = select_transaction(&store, &api, TransactionId::new(1))
            .await
            .unwrap();

        assert_eq!(selection.transaction.id, TransactionId::new(1));
        assert_eq!(selection.similar.len(), 2);
        let stored = store.read(|state| state.selection.clone()).unwrap();
        assert_eq!(stored, Some(selection));
    }

    #[tokio::test]
    async fn select_unknown_transaction_is_not_found() {
        let store = DashboardStore::default();

        let result = select_transaction(&store, &FakeApi::default(), TransactionId::new(1)).await;

        assert_eq!(result, Err(Error::NotFound));
    }

    #[tokio::test]
    async fn submit_adds_processed_transaction() {
        let store = DashboardStore::default();
        let api = FakeApi::default();
        let new_transaction = NewTransaction {
            amount: 5000.0,
            location: "Lagos".to_owned(),
            device: "Android".to_owned(),
            time: datetime!(2024-03-01 09:00 UTC),
        };

        let processed = submit_transaction(&store, &api, &new_transaction)
            .await
            .unwrap()
            .unwrap();

        assert!(processed.is_fraud);
        let state = store.read(|state| state.clone()).unwrap();
        assert_eq!(state.transactions, vec![processed]);
        assert_eq!(state.notice.unwrap().kind, NoticeKind::Success);
        assert_eq!(api.processed(), vec![new_transaction]);
    }

    #[tokio::test]
    async fn submit_without_classification_waits_for_live_feed() {
        let store = DashboardStore::default();
        let api = FakeApi {
            process_without_body: true,
            ..Default::default()
        };
        let new_transaction = NewTransaction {
            amount: 20.0,
            location: "Auckland".to_owned(),
            device: "Web".to_owned(),
            time: datetime!(2024-03-01 09:00 UTC),
        };

        let processed = submit_transaction(&store, &api, &new_transaction)
            .await
            .unwrap();

        assert_eq!(processed, None);
        let state = store.read(|state| state.clone()).unwrap();
        assert!(state.transactions.is_empty());
        assert_eq!(state.notice.unwrap().kind, NoticeKind::Success);
        assert_eq!(api.processed(), vec![new_transaction]);
    }

    #[tokio::test]
    async fn forwards_live_transactions_until_closed() {
        let store = DashboardStore::default();
        let (sender, receiver) = mpsc::unbounded_channel();
        sender.send(transaction(1, 1.0)).unwrap();
        sender.send(transaction(2, 2.0)).unwrap();
        drop(sender);

        forward_live_transactions(store.clone(), receiver).await;

        let ids = store
            .read(|state| {
                state
                    .transactions
                    .iter()
                    .map(|t| t.id.as_i64())
                    .collect::<Vec<_>>()
            })
            .unwrap();
        assert_eq!(ids, [2, 1]);
    }
}
