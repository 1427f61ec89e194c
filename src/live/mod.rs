//! Live ingestion from the push hub and the live feed panel.

mod feed;
mod hub;
mod reconciler;
mod view;
mod websocket;

pub use reconciler::{LiveHandle, PushConnection, PushTransport, ReconnectPolicy};
pub use view::{LiveFeedState, get_live_feed};
pub use websocket::WebSocketTransport;

use tokio::sync::mpsc;

use crate::{
    dashboard::{DashboardStore, forward_live_transactions},
    live::reconciler::LiveReconciler,
};

/// Connect `transport` in the background and fold every new transaction into `store`.
///
/// The returned handle exposes the live feed and connection state to request handlers.
pub fn spawn_live_ingestion<T>(
    transport: T,
    policy: ReconnectPolicy,
    store: DashboardStore,
) -> LiveHandle
where
    T: PushTransport + 'static,
{
    let (sender, receiver) = mpsc::unbounded_channel();
    let (mut reconciler, handle) = LiveReconciler::new(transport, policy, sender);

    tokio::spawn(async move {
        reconciler.run().await;
        tracing::warn!("Live ingestion stopped, the live feed will no longer update");
    });
    tokio::spawn(forward_live_transactions(store, receiver));

    handle
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::{
        Error,
        dashboard::DashboardStore,
        transaction::{TransactionId, test_utils::transaction},
    };

    use super::{
        ReconnectPolicy,
        reconciler::{InboundMessage, PushConnection, PushTransport},
        spawn_live_ingestion,
    };

    struct OneShotTransport;

    struct OneShotConnection {
        messages: Vec<InboundMessage>,
    }

    #[async_trait]
    impl PushTransport for OneShotTransport {
        type Connection = OneShotConnection;

        async fn connect(&self) -> Result<Self::Connection, Error> {
            Ok(OneShotConnection {
                messages: vec![InboundMessage {
                    target: "ReceiveTransaction".to_owned(),
                    payload: serde_json::to_value(transaction(42, 64.0)).unwrap(),
                }],
            })
        }
    }

    #[async_trait]
    impl PushConnection for OneShotConnection {
        async fn next_message(&mut self) -> Option<Result<InboundMessage, Error>> {
            match self.messages.pop() {
                Some(message) => Some(Ok(message)),
                None => Some(Err(Error::PushChannelClosed {
                    reason: "done".to_owned(),
                    allow_reconnect: false,
                })),
            }
        }
    }

    #[tokio::test]
    async fn live_transactions_reach_the_dashboard_store() {
        let store = DashboardStore::default();

        let handle = spawn_live_ingestion(
            OneShotTransport,
            ReconnectPolicy::new(vec![Duration::ZERO]),
            store.clone(),
        );

        let mut found = false;
        for _ in 0..50 {
            found = store
                .read(|state| state.find(TransactionId::new(42)).is_some())
                .unwrap();
            if found {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(found);
        assert_eq!(handle.snapshot().unwrap().recent().count(), 1);
    }
}
