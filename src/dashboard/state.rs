//! The dashboard state container.
//!
//! All changes to the master transaction collection go through [reduce], a
//! pure function from the current state and an [Action] to the next state.
//! [DashboardStore] shares one state between the request handlers and the
//! live feed and applies actions one at a time.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    Error,
    dashboard::filter::FilterSpec,
    html::format_currency,
    transaction::{Transaction, TransactionId},
};

/// Identifies one refresh of the transaction collection.
///
/// IDs increase with every refresh so that a slow response to an older
/// request can be recognised and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// The kind of banner to show with a [Notice].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// The transaction the user is inspecting and its history.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub transaction: Transaction,
    pub similar: Vec<Transaction>,
    /// Whether the similar transactions are still being fetched.
    pub is_loading: bool,
}

/// Everything the dashboard needs to render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    /// The master collection, newest arrivals first.
    pub transactions: Vec<Transaction>,
    pub filter: FilterSpec,
    pub selection: Option<Selection>,
    /// Whether a refresh is in flight.
    pub is_loading: bool,
    /// Whether a refresh has ever completed, successfully or not.
    pub has_loaded: bool,
    pub notice: Option<Notice>,
    latest_request: RequestId,
    /// Transactions added while a refresh was in flight, oldest first.
    arrived_during_refresh: Vec<Transaction>,
}

impl DashboardState {
    /// A state that has already loaded `transactions`.
    #[cfg(test)]
    pub fn with_transactions(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            ..Default::default()
        }
    }

    /// The ID of the most recently started refresh.
    pub fn latest_request(&self) -> RequestId {
        self.latest_request
    }

    /// Find a transaction in the master collection.
    pub fn find(&self, id: TransactionId) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|transaction| transaction.id == id)
    }

    /// Add a transaction that did not come from a refresh.
    ///
    /// While a refresh is in flight the transaction is also remembered so the
    /// refreshed collection can keep it if the API has not caught up yet.
    fn add_arrival(&mut self, transaction: Transaction) {
        if self.is_loading {
            self.arrived_during_refresh.push(transaction.clone());
        }

        upsert_newest(&mut self.transactions, transaction);
    }
}

/// The state transitions of the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A refresh of the transaction collection was started.
    RefreshStarted,
    /// The transactions for the refresh `request` arrived.
    FetchSucceeded {
        request: RequestId,
        transactions: Vec<Transaction>,
    },
    /// The refresh `request` failed.
    FetchFailed { request: RequestId, message: String },
    FilterChanged(FilterSpec),
    /// The user opened the details of a transaction.
    TransactionClicked(Transaction),
    SimilarLoaded {
        id: TransactionId,
        transactions: Vec<Transaction>,
    },
    SimilarFailed { id: TransactionId, message: String },
    /// A transaction arrived on the push channel.
    LiveTransactionReceived(Transaction),
    /// The scoring API accepted a transaction submitted from the form.
    ///
    /// Holds the classified transaction if the API sent it back.
    TransactionSubmitted(Option<Transaction>),
    SubmitFailed(String),
    NoticeDismissed,
}

/// Apply `action` to `state`.
pub fn reduce(mut state: DashboardState, action: Action) -> DashboardState {
    match action {
        Action::RefreshStarted => {
            if !state.is_loading {
                state.arrived_during_refresh.clear();
            }

            state.latest_request = state.latest_request.next();
            state.is_loading = true;
        }
        Action::FetchSucceeded {
            request,
            transactions,
        } => {
            if request != state.latest_request {
                tracing::debug!("Ignoring stale transactions for refresh {request:?}");
                return state;
            }

            state.transactions = transactions;
            for transaction in std::mem::take(&mut state.arrived_during_refresh) {
                if state.find(transaction.id).is_none() {
                    state.transactions.insert(0, transaction);
                }
            }

            state.is_loading = false;
            state.has_loaded = true;
        }
        Action::FetchFailed { request, message } => {
            if request != state.latest_request {
                tracing::debug!("Ignoring stale error for refresh {request:?}: {message}");
                return state;
            }

            state.arrived_during_refresh.clear();
            state.is_loading = false;
            state.has_loaded = true;
            state.notice = Some(Notice::new(NoticeKind::Error, message));
        }
        Action::FilterChanged(filter) => state.filter = filter,
        Action::TransactionClicked(transaction) => {
            state.selection = Some(Selection {
                transaction,
                similar: Vec::new(),
                is_loading: true,
            });
        }
        Action::SimilarLoaded { id, transactions } => match state.selection.as_mut() {
            Some(selection) if selection.transaction.id == id => {
                selection.similar = transactions;
                selection.is_loading = false;
            }
            _ => tracing::debug!("Ignoring similar transactions for deselected transaction {id}"),
        },
        Action::SimilarFailed { id, message } => match state.selection.as_mut() {
            Some(selection) if selection.transaction.id == id => {
                selection.similar.clear();
                selection.is_loading = false;
                state.notice = Some(Notice::new(NoticeKind::Error, message));
            }
            _ => tracing::debug!("Ignoring error for deselected transaction {id}: {message}"),
        },
        Action::LiveTransactionReceived(transaction) => {
            let notice = if transaction.is_fraud {
                Notice::new(
                    NoticeKind::Warning,
                    format!(
                        "Suspicious transaction detected: {}",
                        format_currency(transaction.amount)
                    ),
                )
            } else {
                Notice::new(
                    NoticeKind::Info,
                    format!("New transaction: {}", format_currency(transaction.amount)),
                )
            };

            state.add_arrival(transaction);
            state.notice = Some(notice);
        }
        Action::TransactionSubmitted(transaction) => {
            if let Some(transaction) = transaction {
                state.add_arrival(transaction);
            }
            state.notice = Some(Notice::new(
                NoticeKind::Success,
                "Transaction processed successfully",
            ));
        }
        Action::SubmitFailed(message) => {
            state.notice = Some(Notice::new(NoticeKind::Error, message));
        }
        Action::NoticeDismissed => state.notice = None,
    }

    state
}

/// Put `transaction` at the front of `transactions`, or replace the existing
/// transaction with the same ID where it is.
///
/// A transaction submitted from the form is usually echoed back by the push
/// channel, this keeps it from being listed twice.
fn upsert_newest(transactions: &mut Vec<Transaction>, transaction: Transaction) {
    match transactions
        .iter_mut()
        .find(|existing| existing.id == transaction.id)
    {
        Some(existing) => *existing = transaction,
        None => transactions.insert(0, transaction),
    }
}

/// Shared, synchronised access to the [DashboardState].
#[derive(Debug, Clone, Default)]
pub struct DashboardStore {
    state: Arc<Mutex<DashboardState>>,
}

impl DashboardStore {
    /// Create a store holding `state`.
    pub fn new(state: DashboardState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Apply `action` to the shared state.
    ///
    /// # Errors
    /// Returns [Error::StateLockError] if the lock is poisoned.
    pub fn dispatch(&self, action: Action) -> Result<(), Error> {
        let mut state = self.lock()?;

        let current = std::mem::take(&mut *state);
        *state = reduce(current, action);

        Ok(())
    }

    /// Start a refresh and get the ID its result must be dispatched with.
    pub fn begin_refresh(&self) -> Result<RequestId, Error> {
        let mut state = self.lock()?;

        let current = std::mem::take(&mut *state);
        *state = reduce(current, Action::RefreshStarted);

        Ok(state.latest_request)
    }

    /// Run `read` on the current state.
    ///
    /// The lock is held while `read` runs, so it should only copy out the
    /// data it needs.
    pub fn read<T>(&self, read: impl FnOnce(&DashboardState) -> T) -> Result<T, Error> {
        let state = self.lock()?;

        Ok(read(&state))
    }

    /// Copy the state for rendering a page and dismiss its notice.
    ///
    /// The notice is dismissed under the same lock it is read with, so a
    /// notice raised in the meantime is kept for the next page.
    pub fn take_snapshot(&self) -> Result<DashboardState, Error> {
        let mut state = self.lock()?;
        let snapshot = state.clone();

        if snapshot.notice.is_some() {
            let current = std::mem::take(&mut *state);
            *state = reduce(current, Action::NoticeDismissed);
        }

        Ok(snapshot)
    }

    fn lock(&self) -> Result<MutexGuard<'_, DashboardState>, Error> {
        self.state
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire dashboard state lock: {error}"))
            .map_err(|_| Error::StateLockError)
    }
}
