//! In-memory duplex transport standing in for a router, used by the
//! scenario tests in this directory. No real socket is ever opened.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use wampcore::{Client, ClientConfig, Msg, SerializerImpl, SerializerType, Transport, TransportError, WampDict};

pub struct DuplexTransport {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for DuplexTransport {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.tx.send(data.to_vec()).map_err(|_| TransportError::SendFailed)
    }

    async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        self.rx.recv().await.ok_or(TransportError::Closed)
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// The "router" end of the duplex pipe: encodes/decodes the same JSON wire
/// format the client uses, so a test can script exact WAMP message exchanges.
pub struct MockRouter {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    serializer: Box<dyn SerializerImpl + Send + Sync>,
}

impl MockRouter {
    /// Waits for the client's next message.
    pub async fn recv_msg(&mut self) -> Msg {
        let payload = self.rx.recv().await.expect("client transport closed unexpectedly");
        self.serializer.unpack(&payload).expect("client sent an undecodable message")
    }

    /// Same as `recv_msg`, but returns `None` once the client side closes.
    pub async fn try_recv_msg(&mut self) -> Option<Msg> {
        let payload = self.rx.recv().await?;
        Some(self.serializer.unpack(&payload).expect("client sent an undecodable message"))
    }

    pub async fn send_msg(&mut self, msg: &Msg) {
        let payload = self.serializer.pack(msg).expect("failed to encode mock router message");
        let _ = self.tx.send(payload);
    }
}

/// Builds a connected client/router pair sharing an in-memory transport.
pub fn mock_pair() -> (DuplexTransport, MockRouter) {
    let (transport, router, _closed) = mock_pair_observable();
    (transport, router)
}

/// Same as [`mock_pair`], but also returns a flag set once the client side
/// calls `Transport::close`.
pub fn mock_pair_observable() -> (DuplexTransport, MockRouter, Arc<AtomicBool>) {
    let (client_tx, router_rx) = mpsc::unbounded_channel();
    let (router_tx, client_rx) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));

    let client = DuplexTransport { tx: client_tx, rx: client_rx, closed: closed.clone() };
    let router = MockRouter { tx: router_tx, rx: router_rx, serializer: SerializerType::Json.new_impl().unwrap() };
    (client, router, closed)
}

/// Spawns a `Client`'s event loop (and, if it can be a callee, a task
/// draining its RPC event queue) the way a real caller is required to.
pub fn spawn_client_plumbing(
    event_loop: wampcore::GenericFuture<'static>,
    rpc_queue: Option<mpsc::UnboundedReceiver<wampcore::GenericFuture<'static>>>,
) {
    tokio::spawn(event_loop);
    if let Some(mut rpc_queue) = rpc_queue {
        tokio::spawn(async move {
            while let Some(fut) = rpc_queue.recv().await {
                tokio::spawn(fut);
            }
        });
    }
}

/// Drives an anonymous HELLO/WELCOME handshake to completion against a
/// scripted router.
pub async fn join_over(client: &mut Client, router: &mut MockRouter) {
    let (join_res, _) = tokio::join!(client.join_realm("test.realm"), async {
        match router.recv_msg().await {
            Msg::Hello { .. } => {}
            other => panic!("expected HELLO, got {:?}", other),
        }
        router.send_msg(&Msg::Welcome { session: 4242, details: WampDict::new() }).await;
    });
    join_res.expect("join_realm failed");
}

/// Spins up a `Client` against a mock router, spawns its event loop, and
/// drives an anonymous join to completion. Returns the joined client and the
/// router handle so the test can script the rest of the session.
pub async fn joined_client(cfg: ClientConfig) -> (Client, MockRouter) {
    let (transport, mut router) = mock_pair();
    let (mut client, (event_loop, rpc_queue)) =
        Client::connect_with_transport(Box::new(transport), SerializerType::Json, Some(cfg))
            .await
            .expect("mock connect never fails");

    spawn_client_plumbing(event_loop, rpc_queue);
    join_over(&mut client, &mut router).await;

    (client, router)
}
