use std::collections::{HashMap, HashSet};

use log::*;
use tokio::select;
use tokio::sync::oneshot::Sender;
use tokio::sync::{mpsc, mpsc::UnboundedReceiver, mpsc::UnboundedSender};

use crate::common::*;
use crate::error::*;
use crate::invocation::{Interrupt, Invocation, RpcFunc};
use crate::serializer::*;
use crate::transport::*;

mod recv;
mod send;

use crate::client;
use crate::message::*;
pub use send::{CallResult, JoinRealmResult, Request};

pub enum Status {
    /// Returned when the event loop should shutdown
    Shutdown,
    Ok,
}

pub type JoinResult = Sender<JoinRealmResult>;
pub type SubscriptionQueue = UnboundedReceiver<(
    WampId,           // Publish event ID
    Option<WampArgs>, // Publish args
    Option<WampKwArgs>,
)>; // publish kwargs
pub type PendingSubResult = Sender<Result<(WampId, SubscriptionQueue), WampError>>;
pub type PendingRegisterResult = Sender<Result<WampId, WampError>>;

/// A call awaiting a terminal RESULT/ERROR. Progress results are forwarded
/// on `progress_tx`; `final_tx` is consumed exactly once.
struct OngoingCall {
    progress_tx: UnboundedSender<(Option<WampArgs>, Option<WampKwArgs>)>,
    final_tx: Option<Sender<CallResult>>,
}

pub struct Core {
    /// Generic transport
    sock: Box<dyn Transport + Send>,
    valid_session: bool,
    core_res: UnboundedSender<Result<(), WampError>>,
    /// Generic serializer
    serializer: Box<dyn SerializerImpl + Send + Sync>,
    /// Holds the request_id queues waiting for messages
    ctl_sender: UnboundedSender<Request>,
    /// Channel for receiving client requests
    ctl_channel: Option<UnboundedReceiver<Request>>, //Wrapped in option so we can give ownership to eventloop

    ids: IdGenerator,
    /// Holds set of pending requests
    pending_requests: HashSet<WampId>,
    /// Holds generic transactions that can succeed/fail (un/subscribe, un/register)
    pending_transactions: HashMap<WampId, Sender<Result<(), WampError>>>,

    /// Pending subscription requests sent to the server
    pending_sub: HashMap<WampId, PendingSubResult>,
    /// Publications awaiting a PUBLISHED ack (only populated when `acknowledge` was set)
    pending_publish_ack: HashMap<WampId, Sender<Result<Option<WampId>, WampError>>>,
    /// Current subscriptions
    subscriptions: HashMap<WampId, UnboundedSender<(WampId, Option<WampArgs>, Option<WampKwArgs>)>>,

    /// Pending RPC registration requests sent to the server
    pending_register: HashMap<WampId, (RpcFunc, PendingRegisterResult)>,
    /// Currently registered RPC endpoints: registration id -> handler
    rpc_endpoints: HashMap<WampId, RpcFunc>,
    /// Queue passed back to the client caller to drive invocation handler futures
    pub rpc_event_queue_r: Option<UnboundedReceiver<GenericFuture<'static>>>,
    rpc_event_queue_w: UnboundedSender<GenericFuture<'static>>,

    /// Calls that have been sent and are awaiting a reply
    ongoing_calls: HashMap<WampId, OngoingCall>,
    /// Invocations currently being handled, for INTERRUPT delivery
    running_invocations: HashMap<WampId, crate::invocation::InterruptSource>,
}

impl Core {
    /// Establishes a connection with a WAMP server
    pub async fn connect(
        uri: &url::Url,
        cfg: &client::ClientConfig,
        ctl_channel: (UnboundedSender<Request>, UnboundedReceiver<Request>),
        core_res: UnboundedSender<Result<(), WampError>>,
    ) -> Result<Core, WampError> {
        // Connect to the router using the requested transport
        let (sock, serializer_type) = match uri.scheme() {
            "ws" | "wss" => ws::connect(uri, cfg).await?,
            "tcp" | "tcps" => {
                let host_port = match uri.port() {
                    Some(p) => p,
                    None => return Err(WampError::NoHostInUri),
                };

                tcp::connect(
                    uri.host_str().ok_or(WampError::NoHostInUri)?,
                    host_port,
                    uri.scheme() != "tcp",
                    cfg,
                )
                .await?
            }
            s => return Err(From::from(format!("Unknown uri scheme : {}", s))),
        };

        debug!("Connected with serializer : {:?}", serializer_type);

        Self::with_transport(sock, serializer_type, ctl_channel, core_res)
    }

    /// Builds a `Core` around an already-established transport, skipping uri
    /// dispatch entirely. Used by `connect` above and, directly, by test
    /// harnesses wiring up an in-memory transport.
    pub fn with_transport(
        sock: Box<dyn Transport + Send>,
        serializer_type: SerializerType,
        ctl_channel: (UnboundedSender<Request>, UnboundedReceiver<Request>),
        core_res: UnboundedSender<Result<(), WampError>>,
    ) -> Result<Core, WampError> {
        let serializer = serializer_type
            .new_impl()
            .ok_or_else(|| WampError::UnknownError("server picked an unsupported serializer".into()))?;

        let (rpc_event_queue_w, rpc_event_queue_r) = mpsc::unbounded_channel();

        Ok(Core {
            sock,
            core_res,
            valid_session: false,
            serializer,
            ctl_sender: ctl_channel.0,
            ctl_channel: Some(ctl_channel.1),
            ids: IdGenerator::new(),
            pending_requests: HashSet::new(),
            pending_transactions: HashMap::new(),

            pending_sub: HashMap::new(),
            pending_publish_ack: HashMap::new(),
            subscriptions: HashMap::new(),

            pending_register: HashMap::new(),
            rpc_endpoints: HashMap::new(),
            rpc_event_queue_r: Some(rpc_event_queue_r),
            rpc_event_queue_w,
            ongoing_calls: HashMap::new(),
            running_invocations: HashMap::new(),
        })
    }

    /// Event loop that handles outbound/inboud events
    pub async fn event_loop(mut self) -> Result<(), WampError> {
        let mut ctl_channel = self.ctl_channel.take().unwrap();

        // Notify the client that we are now running the event loop
        let _ = self.core_res.send(Ok(()));
        loop {
            match select! {
                // Peer sent us a message
                msg = self.recv() => {
                    match msg {
                        Err(e) => {
                            /* The WAMP spec leaves it up to the server implementation
                            to decide whether to close a connection or not after a
                            GOODBYE message (leaving the realm). If we have left the realm,
                            treat a recv() error as expected */
                            if self.valid_session {
                                error!("Failed to recv : {:?}", e);
                                let _ = self.core_res.send(Err(e));
                            }

                            break;
                        },
                        Ok(m) => self.handle_peer_msg(m).await,
                    }
                },
                // client wants to send a message
                req = ctl_channel.recv() => {
                    let req = match req {
                        Some(r) => r,
                        None => {
                            let _ = self.core_res.send(Err(WampError::ClientDied));
                            break;
                        }
                    };
                    self.handle_local_request(req).await
                }
            } {
                Status::Shutdown => {
                    let _ = self.core_res.send(Ok(()));
                    break;
                }
                Status::Ok => {}
            }
        }
        debug!("Event loop shutting down !");

        self.shutdown().await;

        Ok(())
    }

    /// Handles unsolicited messages from the peer (events, rpc calls, etc...)
    async fn handle_peer_msg(&mut self, msg: Msg) -> Status {
        match msg {
            Msg::Subscribed { request, subscription } => recv::subscribed(self, request, subscription).await,
            Msg::Unsubscribed { request } => recv::unsubscribed(self, request).await,
            Msg::Published { request, publication } => recv::published(self, request, publication).await,
            Msg::Event { subscription, publication, details, arguments, arguments_kw } => {
                recv::event(self, subscription, publication, details, arguments, arguments_kw).await
            }
            Msg::Registered { request, registration } => recv::registered(self, request, registration).await,
            Msg::Unregistered { request } => recv::unregistered(self, request).await,
            Msg::Invocation { request, registration, details, arguments, arguments_kw } => {
                recv::invocation(self, request, registration, details, arguments, arguments_kw).await
            }
            Msg::Interrupt { request, options } => recv::interrupt(self, request, options).await,
            Msg::Result { request, details, arguments, arguments_kw } => {
                recv::call_result(self, request, details, arguments, arguments_kw).await
            }
            Msg::Goodbye { details, reason } => recv::goodbye(self, details, reason).await,
            Msg::Abort { details, reason } => recv::abort(self, details, reason).await,
            Msg::Error { request_type, request, details, error, arguments, arguments_kw } => {
                recv::error(self, request_type, request, details, error, arguments, arguments_kw).await
            }
            _ => {
                warn!("Recevied unhandled message {:?}", msg);
                Status::Ok
            }
        }
    }

    /// Handles the basic ways one can interact with the peer
    async fn handle_local_request(&mut self, req: Request) -> Status {
        match req {
            Request::Shutdown => Status::Shutdown,
            Request::Join {
                uri,
                roles,
                agent_str,
                keyring,
                res,
            } => send::join_realm(self, uri, roles, agent_str, keyring, res).await,
            Request::Leave { res } => send::leave_realm(self, res).await,
            Request::Subscribe { uri, options, res } => send::subscribe(self, uri, options, res).await,
            Request::Unsubscribe { sub_id, res } => send::unsubscribe(self, sub_id, res).await,
            Request::Publish { uri, options, arguments, arguments_kw, res } => {
                send::publish(self, uri, options, arguments, arguments_kw, res).await
            }
            Request::Register { uri, options, res, func_ptr } => {
                send::register(self, uri, options, res, func_ptr).await
            }
            Request::Unregister { rpc_id, res } => send::unregister(self, rpc_id, res).await,
            Request::InvocationProgress { request, arguments, arguments_kw } => {
                send::invoke_progress(self, request, arguments, arguments_kw).await
            }
            Request::InvocationResult { request, res } => send::invoke_yield(self, request, res).await,
            Request::Call { uri, options, arguments, arguments_kw, res } => {
                send::call(self, uri, options, arguments, arguments_kw, res).await
            }
            Request::Cancel { request, mode, res } => send::cancel(self, request, mode, res).await,
        }
    }

    /// Serializes a message and sends it on the transport
    pub async fn send(&mut self, msg: &Msg) -> Result<(), WampError> {
        let payload = self.serializer.pack(msg)?;

        match std::str::from_utf8(&payload) {
            Ok(v) => debug!("Send : {}", v),
            Err(_) => debug!("Send : {:?}", msg),
        };

        self.sock.send(&payload).await?;

        Ok(())
    }

    /// Receives a message and deserializes it
    pub async fn recv(&mut self) -> Result<Msg, WampError> {
        let payload = self.sock.recv().await?;

        let msg = self.serializer.unpack(&payload);

        match std::str::from_utf8(&payload) {
            Ok(v) => debug!("Recv : {}", v),
            Err(_) => debug!("Recv : {:?}", msg),
        };

        Ok(msg?)
    }

    /// Closes the transport
    pub async fn shutdown(mut self) {
        self.sock.close().await;
    }

    /// Generates a new request_id and inserts it into the pending_requests
    fn create_request(&mut self) -> WampId {
        let mut request = self.ids.next_id();
        while !self.pending_requests.insert(request) {
            request = self.ids.next_id();
        }
        request
    }

    /// Spawns an invocation handler future onto the rpc event queue, wiring
    /// up interrupt delivery and the progress/result callback.
    fn dispatch_invocation(
        &mut self,
        request: WampId,
        registration: WampId,
        details: WampDict,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    ) {
        let func = match self.rpc_endpoints.get(&registration) {
            Some(f) => f,
            None => {
                warn!("Peer sent INVOCATION for an unknown registration {}", registration);
                return;
            }
        };

        let (interrupt, interrupt_source) = Interrupt::new();
        self.running_invocations.insert(request, interrupt_source);

        let invocation = Invocation::new(
            request,
            registration,
            None,
            arguments,
            arguments_kw,
            details,
            interrupt,
            self.ctl_sender.clone(),
        );

        let handler_future = func(invocation);
        let ctl = self.ctl_sender.clone();
        let boxed: GenericFuture<'static> = Box::pin(async move {
            let res = handler_future.await;
            let _ = ctl.send(Request::InvocationResult { request, res });
            Ok(())
        });

        if self.rpc_event_queue_w.send(boxed).is_err() {
            warn!("No one is driving the rpc event queue; invocation {} will never complete", request);
        }
    }
}
