//! Keeps the live feed connected to the push hub.
//!
//! [LiveReconciler] drives a [PushTransport] through the connection states,
//! reconnecting with the delays of a [ReconnectPolicy] when the connection
//! drops. Inbound transactions are decoded, added to the [LiveFeed], and new
//! transactions are forwarded to the dashboard over a channel.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc::UnboundedSender, watch};

use crate::{
    Error,
    live::feed::{EventKind, LiveFeed, PushEvent},
    transaction::Transaction,
};

/// Where the connection to the push hub is at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// The connection was lost and another attempt is pending.
    Reconnecting,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Reconnecting => "Reconnecting",
        }
    }
}

/// The delays to wait before each reconnection attempt.
///
/// Once every delay has been used without a successful connection, the
/// reconciler gives up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    delays: Vec<Duration>,
}

impl ReconnectPolicy {
    /// Create a policy that waits `delays[n]` before connection attempt `n`.
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// The delay before reconnection attempt `attempt`, counting from zero,
    /// or `None` if no attempts are left.
    pub fn next_delay(&self, attempt: usize) -> Option<Duration> {
        self.delays.get(attempt).copied()
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(
            [0, 2, 10, 30]
                .into_iter()
                .map(Duration::from_secs)
                .collect(),
        )
    }
}

/// A client method call received from the hub.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// The name of the client method, e.g. "ReceiveTransaction".
    pub target: String,
    /// The first argument of the call.
    pub payload: Value,
}

/// Opens connections to the push hub.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// The connection yielded by a successful [PushTransport::connect].
    type Connection: PushConnection;

    /// Connect and complete the handshake.
    ///
    /// # Errors
    /// An [Error::PushChannelClosed] that does not allow reconnecting stops
    /// the reconciler, any other error is retried.
    async fn connect(&self) -> Result<Self::Connection, Error>;
}

/// An open connection to the push hub.
#[async_trait]
pub trait PushConnection: Send {
    /// Wait for the next invocation.
    ///
    /// Returns `None` once the connection has closed.
    async fn next_message(&mut self) -> Option<Result<InboundMessage, Error>>;
}

/// The events the reconciler handles, at most one registration per event.
#[derive(Debug, Default)]
pub struct Subscriptions {
    events: HashSet<EventKind>,
}

impl Subscriptions {
    /// Register `kind`, returns false if it was already registered.
    pub fn subscribe(&mut self, kind: EventKind) -> bool {
        self.events.insert(kind)
    }

    pub fn contains(&self, kind: EventKind) -> bool {
        self.events.contains(&kind)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.events.len()
    }
}

/// Read access to the live feed for request handlers.
#[derive(Debug, Clone)]
pub struct LiveHandle {
    feed: Arc<Mutex<LiveFeed>>,
    state: watch::Receiver<ConnectionState>,
}

impl LiveHandle {
    /// A handle for when no push hub is configured.
    pub fn disconnected() -> Self {
        let (_, state) = watch::channel(ConnectionState::Disconnected);

        Self {
            feed: Arc::default(),
            state,
        }
    }

    /// The latest connection state reported by the reconciler.
    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Copy the current feed.
    ///
    /// # Errors
    /// Returns [Error::StateLockError] if the lock is poisoned.
    pub fn snapshot(&self) -> Result<LiveFeed, Error> {
        self.feed
            .lock()
            .map(|feed| feed.clone())
            .inspect_err(|error| tracing::error!("could not acquire live feed lock: {error}"))
            .map_err(|_| Error::StateLockError)
    }
}

/// Reconciles the push hub into the [LiveFeed].
pub struct LiveReconciler<T: PushTransport> {
    transport: T,
    policy: ReconnectPolicy,
    subscriptions: Subscriptions,
    feed: Arc<Mutex<LiveFeed>>,
    state: watch::Sender<ConnectionState>,
    new_transactions: UnboundedSender<Transaction>,
}

impl<T: PushTransport> LiveReconciler<T> {
    /// Create a reconciler that sends each new transaction to `new_transactions`.
    pub fn new(
        transport: T,
        policy: ReconnectPolicy,
        new_transactions: UnboundedSender<Transaction>,
    ) -> (Self, LiveHandle) {
        let feed = Arc::new(Mutex::new(LiveFeed::default()));
        let (state, state_receiver) = watch::channel(ConnectionState::Disconnected);

        let handle = LiveHandle {
            feed: feed.clone(),
            state: state_receiver,
        };

        let reconciler = Self {
            transport,
            policy,
            subscriptions: Subscriptions::default(),
            feed,
            state,
            new_transactions,
        };

        (reconciler, handle)
    }

    #[cfg(test)]
    pub fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    /// Stay connected until the hub forbids reconnecting or the reconnect
    /// policy is exhausted.
    pub async fn run(&mut self) {
        let mut attempt = 0;
        self.set_state(ConnectionState::Connecting);

        loop {
            match self.transport.connect().await {
                Ok(mut connection) => {
                    attempt = 0;
                    self.register_subscriptions();
                    self.set_state(ConnectionState::Connected);
                    tracing::info!("Connected to the push hub");

                    match self.consume(&mut connection).await {
                        Ok(()) => tracing::warn!("The push hub closed the connection"),
                        Err(Error::PushChannelClosed {
                            reason,
                            allow_reconnect: false,
                        }) => {
                            tracing::error!("The push hub closed the connection for good: {reason}");
                            break;
                        }
                        Err(error) => tracing::warn!("Lost the connection to the push hub: {error}"),
                    }
                }
                Err(Error::PushChannelClosed {
                    reason,
                    allow_reconnect: false,
                }) => {
                    tracing::error!("The push hub refused the connection: {reason}");
                    break;
                }
                Err(error) => tracing::warn!("Could not connect to the push hub: {error}"),
            }

            let Some(delay) = self.policy.next_delay(attempt) else {
                tracing::error!(
                    "Giving up on the push hub after {attempt} reconnection attempts, \
                    the live feed will not update"
                );
                break;
            };

            attempt += 1;
            self.set_state(ConnectionState::Reconnecting);
            tracing::info!("Reconnecting to the push hub in {delay:?} (attempt {attempt})");
            tokio::time::sleep(delay).await;
        }

        self.set_state(ConnectionState::Disconnected);
    }

    fn set_state(&self, state: ConnectionState) {
        tracing::debug!("Push hub connection state: {}", state.label());
        self.state.send_replace(state);
    }

    fn register_subscriptions(&mut self) {
        for kind in EventKind::ALL {
            if self.subscriptions.subscribe(kind) {
                tracing::debug!("Subscribed to {}", kind.target());
            }
        }
    }

    async fn consume(&mut self, connection: &mut T::Connection) -> Result<(), Error> {
        while let Some(message) = connection.next_message().await {
            self.handle(message?);
        }

        Ok(())
    }

    fn handle(&mut self, message: InboundMessage) {
        let InboundMessage { target, payload } = message;

        let Some(kind) = EventKind::from_target(&target)
            .filter(|kind| self.subscriptions.contains(*kind))
        else {
            tracing::debug!("Ignoring push hub invocation of {target}");
            return;
        };

        let transaction: Transaction = match serde_json::from_value(payload) {
            Ok(transaction) => transaction,
            Err(error) => {
                tracing::warn!("Skipping malformed {target} payload: {error}");
                return;
            }
        };

        if kind == EventKind::ReceiveTransaction
            && self.new_transactions.send(transaction.clone()).is_err()
        {
            tracing::debug!("The dashboard is no longer receiving live transactions");
        }

        match self.feed.lock() {
            Ok(mut feed) => feed.apply(PushEvent { kind, transaction }),
            Err(error) => tracing::error!("could not acquire live feed lock: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::mpsc;

    use crate::{Error, live::feed::EventKind};

    use super::{
        ConnectionState, InboundMessage, LiveReconciler, PushConnection, PushTransport,
        ReconnectPolicy,
    };

    type Script = Result<Vec<Result<InboundMessage, Error>>, Error>;

    /// Plays back one scripted connection per call to `connect`, failing
    /// with a transport error once the script runs out.
    #[derive(Default)]
    struct ScriptedTransport {
        connections: Mutex<VecDeque<Script>>,
        connect_calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(connections: Vec<Script>) -> Self {
            Self {
                connections: Mutex::new(connections.into()),
                connect_calls: AtomicUsize::new(0),
            }
        }

        fn connect_calls(&self) -> usize {
            self.connect_calls.load(Ordering::SeqCst)
        }
    }

    struct ScriptedConnection {
        messages: VecDeque<Result<InboundMessage, Error>>,
    }

    #[async_trait]
    impl PushTransport for ScriptedTransport {
        type Connection = ScriptedConnection;

        async fn connect(&self) -> Result<Self::Connection, Error> {
            self.connect_calls.fetch_add(1, Ordering::SeqCst);

            let script = self
                .connections
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Transport("connection refused".to_owned())));

            script.map(|messages| ScriptedConnection {
                messages: messages.into(),
            })
        }
    }

    #[async_trait]
    impl PushConnection for ScriptedConnection {
        async fn next_message(&mut self) -> Option<Result<InboundMessage, Error>> {
            self.messages.pop_front()
        }
    }

    fn invocation(target: &str, id: i64) -> Result<InboundMessage, Error> {
        Ok(InboundMessage {
            target: target.to_owned(),
            payload: json!({ "id": id, "amount": 10.0, "isFraud": target == "ReceiveFraudAlert" }),
        })
    }

    fn instant_retries(count: usize) -> ReconnectPolicy {
        ReconnectPolicy::new(vec![Duration::ZERO; count])
    }

    fn refused() -> Script {
        Err(Error::Transport("connection refused".to_owned()))
    }

    #[test]
    fn default_policy_matches_hub_client() {
        let policy = ReconnectPolicy::default();

        assert_eq!(policy.next_delay(0), Some(Duration::ZERO));
        assert_eq!(policy.next_delay(1), Some(Duration::from_secs(2)));
        assert_eq!(policy.next_delay(3), Some(Duration::from_secs(30)));
        assert_eq!(policy.next_delay(4), None);
    }

    #[tokio::test]
    async fn routes_events_to_feed_and_dashboard() {
        let transport = ScriptedTransport::new(vec![Ok(vec![
            invocation("ReceiveTransaction", 1),
            invocation("ReceiveFraudAlert", 2),
            invocation("ReceiveTransaction", 3),
        ])]);
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let (mut reconciler, handle) =
            LiveReconciler::new(transport, instant_retries(0), sender);

        reconciler.run().await;

        let feed = handle.snapshot().unwrap();
        let recent: Vec<_> = feed.recent().map(|t| t.id.as_i64()).collect();
        let alerts: Vec<_> = feed.alerts().map(|t| t.id.as_i64()).collect();
        assert_eq!(recent, [3, 1]);
        assert_eq!(alerts, [2]);
        assert_eq!(receiver.recv().await.unwrap().id.as_i64(), 1);
        assert_eq!(receiver.recv().await.unwrap().id.as_i64(), 3);
        assert!(receiver.try_recv().is_err(), "alerts must not be forwarded");
    }

    #[tokio::test]
    async fn missing_payload_fields_use_defaults() {
        let transport = ScriptedTransport::new(vec![Ok(vec![Ok(InboundMessage {
            target: "ReceiveTransaction".to_owned(),
            payload: json!({ "id": 5, "amount": null }),
        })])]);
        let (sender, _receiver) = mpsc::unbounded_channel();
        let (mut reconciler, handle) =
            LiveReconciler::new(transport, instant_retries(0), sender);

        reconciler.run().await;

        let feed = handle.snapshot().unwrap();
        let transaction = feed.recent().next().unwrap();
        assert_eq!(transaction.amount, 0.0);
        assert_eq!(transaction.anomaly_score, 0.0);
        assert_eq!(transaction.location, "Unknown");
    }

    #[tokio::test]
    async fn skips_unknown_targets_and_malformed_payloads() {
        let transport = ScriptedTransport::new(vec![Ok(vec![
            invocation("ReceiveSomethingElse", 1),
            Ok(InboundMessage {
                target: "ReceiveTransaction".to_owned(),
                payload: json!("not a transaction"),
            }),
            invocation("ReceiveTransaction", 2),
        ])]);
        let (sender, _receiver) = mpsc::unbounded_channel();
        let (mut reconciler, handle) =
            LiveReconciler::new(transport, instant_retries(0), sender);

        reconciler.run().await;

        let feed = handle.snapshot().unwrap();
        assert_eq!(feed.recent().map(|t| t.id.as_i64()).collect::<Vec<_>>(), [2]);
    }

    #[tokio::test]
    async fn reconnect_keeps_single_subscription_per_event() {
        let transport = ScriptedTransport::new(vec![
            Ok(vec![
                invocation("ReceiveTransaction", 1),
                Err(Error::Transport("connection reset".to_owned())),
            ]),
            Ok(vec![invocation("ReceiveTransaction", 2)]),
        ]);
        let (sender, _receiver) = mpsc::unbounded_channel();
        let (mut reconciler, handle) =
            LiveReconciler::new(transport, instant_retries(1), sender);

        reconciler.run().await;

        assert_eq!(reconciler.subscriptions().len(), EventKind::ALL.len());
        let feed = handle.snapshot().unwrap();
        assert_eq!(feed.recent().map(|t| t.id.as_i64()).collect::<Vec<_>>(), [2, 1]);
    }

    #[tokio::test]
    async fn gives_up_when_policy_is_exhausted() {
        let transport = ScriptedTransport::default();
        let (sender, _receiver) = mpsc::unbounded_channel();
        let (mut reconciler, handle) =
            LiveReconciler::new(transport, instant_retries(2), sender);

        reconciler.run().await;

        assert_eq!(reconciler.transport.connect_calls(), 3);
        assert_eq!(handle.connection_state(), ConnectionState::Disconnected);
        assert!(handle.snapshot().unwrap().is_empty());
    }

    #[tokio::test]
    async fn successful_connection_resets_attempts() {
        let transport = ScriptedTransport::new(vec![refused(), Ok(vec![]), refused(), refused()]);
        let (sender, _receiver) = mpsc::unbounded_channel();
        let (mut reconciler, _handle) =
            LiveReconciler::new(transport, instant_retries(2), sender);

        reconciler.run().await;

        assert_eq!(reconciler.transport.connect_calls(), 4);
    }

    #[tokio::test]
    async fn stops_when_hub_forbids_reconnect() {
        let transport = ScriptedTransport::new(vec![Ok(vec![Err(Error::PushChannelClosed {
            reason: "server shutting down".to_owned(),
            allow_reconnect: false,
        })])]);
        let (sender, _receiver) = mpsc::unbounded_channel();
        let (mut reconciler, handle) =
            LiveReconciler::new(transport, instant_retries(3), sender);

        reconciler.run().await;

        assert_eq!(reconciler.transport.connect_calls(), 1);
        assert_eq!(handle.connection_state(), ConnectionState::Disconnected);
    }
}
