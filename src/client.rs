use std::collections::{HashMap, HashSet};
use std::future::Future;

use futures::FutureExt;
use log::*;
use tokio::sync::oneshot;
use tokio::sync::{mpsc, mpsc::UnboundedReceiver, mpsc::UnboundedSender};
use url::*;

pub use crate::common::*;
use crate::auth::{AuthKeyring, AuthMethod, CryptoSign};
use crate::call::Call;
use crate::core::*;
use crate::error::*;
use crate::invocation::{Invocation, InvocationResult, RpcFunc};
use crate::options::{CallOptions, OptionBuilder, PublishOptions, RegisterOptions, SubscribeOptions};
use crate::serializer::SerializerType;

/// Options one can set when connecting to a WAMP server
pub struct ClientConfig {
    /// Replaces the default user agent string
    agent: String,
    /// A Set of all the roles the client will support
    roles: HashSet<ClientRole>,
    /// A priority list of which serializer to use when talking to the server
    serializers: Vec<SerializerType>,
    /// Sets the maximum message to be sent over the transport
    max_msg_size: u32,
    /// When using a secure transport, this option disables certificate validation
    ssl_verify: bool,
    /// Additional WebSocket headers on establish connection
    websocket_headers: HashMap<String, String>,
}

impl Default for ClientConfig {
    /// Creates a client config with reasonnable defaults
    ///
    /// Roles :
    /// - [ClientRole::Caller](enum.ClientRole.html#variant.Caller)
    /// - [ClientRole::Callee](enum.ClientRole.html#variant.Callee)
    /// - [ClientRole::Publisher](enum.ClientRole.html#variant.Publisher)
    /// - [ClientRole::Subscriber](enum.ClientRole.html#variant.Subscriber)
    ///
    /// Serializers :
    /// 1. [SerializerType::Json](enum.SerializerType.html#variant.Json)
    /// 2. [SerializerType::MsgPack](enum.SerializerType.html#variant.MsgPack)
    fn default() -> Self {
        ClientConfig {
            agent: String::from(DEFAULT_AGENT_STR),
            roles: [
                ClientRole::Caller,
                ClientRole::Callee,
                ClientRole::Publisher,
                ClientRole::Subscriber,
            ]
            .iter()
            .cloned()
            .collect(),
            serializers: vec![SerializerType::Json, SerializerType::MsgPack],
            max_msg_size: 0,
            ssl_verify: true,
            websocket_headers: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Replaces the default user agent string. Set to a zero length string to disable
    pub fn set_agent<T: AsRef<str>>(mut self, agent: T) -> Self {
        self.agent = String::from(agent.as_ref());
        self
    }
    /// Returns the currently set agent string
    pub fn get_agent(&self) -> &str {
        &self.agent
    }

    /// Sets the maximum payload size which can be sent over the transport.
    /// Set to 0 to use the transport's default.
    pub fn set_max_msg_size(mut self, msg_size: u32) -> Self {
        self.max_msg_size = msg_size;
        self
    }
    /// Returns the maximum message size for the transport
    pub fn get_max_msg_size(&self) -> Option<u32> {
        if self.max_msg_size == 0 {
            None
        } else {
            Some(self.max_msg_size)
        }
    }

    /// Sets the serializers that will be used in order of preference (serializers[0] will be attempted first)
    pub fn set_serializers(mut self, serializers: Vec<SerializerType>) -> Self {
        self.serializers = serializers;
        self
    }
    /// Returns the priority list of serializers
    pub fn get_serializers(&self) -> &Vec<SerializerType> {
        &self.serializers
    }

    /// Sets the roles that are intended to be used by the client
    pub fn set_roles(mut self, roles: Vec<ClientRole>) -> Self {
        self.roles.drain();
        for role in roles {
            self.roles.insert(role);
        }
        self
    }

    /// Enables (default) or disables TLS certificate validation
    pub fn set_ssl_verify(mut self, val: bool) -> Self {
        self.ssl_verify = val;
        self
    }
    /// Returns whether certificate validation is enabled
    pub fn get_ssl_verify(&self) -> bool {
        self.ssl_verify
    }

    pub fn add_websocket_header(mut self, key: String, val: String) -> Self {
        self.websocket_headers.insert(key, val);
        self
    }
    pub fn get_websocket_headers(&self) -> &HashMap<String, String> {
        &self.websocket_headers
    }
}

/// All the states a client can be in
pub enum ClientState {
    /// The event loop hasn't been spawned yet
    NoEventLoop,
    /// Currently running and connected to a server
    Running,
    /// Disconnected from a server
    Disconnected(Result<(), WampError>),
}

/// Allows interaction as a client with a WAMP server
pub struct Client {
    /// Configuration struct used to customize the client
    config: ClientConfig,
    /// The uri passed to `connect()`; realms are resolved against it
    base_uri: Url,
    core_res: UnboundedReceiver<Result<(), WampError>>,
    core_status: ClientState,
    /// Current Session ID, set once `join_realm*` succeeds
    session_id: Option<WampId>,
    /// Details the router sent in WELCOME
    welcome_details: WampDict,
    /// Channel to send requests to the event loop
    ctl_channel: UnboundedSender<Request>,
}

impl Client {
    /// Connects to a WAMP server using the specified protocol.
    ///
    /// On success, this function returns:
    /// - `Client`: used to interact with the server
    /// - main event loop future: __this MUST be spawned by the caller__ (e.g. via `tokio::spawn()`)
    /// - RPC event queue: if you register RPC endpoints, you MUST spawn a separate task to drive it
    ///
    /// To customize the connection, see [`ClientConfig`].
    pub async fn connect<T: AsRef<str>>(
        uri: T,
        cfg: Option<ClientConfig>,
    ) -> Result<
        (
            Client,
            (GenericFuture<'static>, Option<UnboundedReceiver<GenericFuture<'static>>>),
        ),
        WampError,
    > {
        let uri = Url::parse(uri.as_ref()).map_err(WampError::InvalidUri)?;

        let config = cfg.unwrap_or_default();

        let (ctl_channel, ctl_receiver) = mpsc::unbounded_channel();
        let (core_res_w, core_res) = mpsc::unbounded_channel();

        let ctl_sender = ctl_channel.clone();
        let mut conn = Core::connect(&uri, &config, (ctl_sender, ctl_receiver), core_res_w).await?;

        let rpc_evt_queue = if config.roles.contains(&ClientRole::Callee) {
            conn.rpc_event_queue_r.take()
        } else {
            None
        };

        Ok((
            Client {
                config,
                base_uri: uri,
                session_id: None,
                welcome_details: WampDict::new(),
                ctl_channel,
                core_res,
                core_status: ClientState::NoEventLoop,
            },
            (Box::pin(conn.event_loop()), rpc_evt_queue),
        ))
    }

    /// Builds a `Client` around an already-established transport, bypassing
    /// uri-based dispatch entirely. Intended for driving the event loop
    /// against an in-memory transport in tests; not used by `connect`.
    #[doc(hidden)]
    pub async fn connect_with_transport(
        sock: Box<dyn crate::transport::Transport + Send>,
        serializer_type: SerializerType,
        cfg: Option<ClientConfig>,
    ) -> Result<
        (
            Client,
            (GenericFuture<'static>, Option<UnboundedReceiver<GenericFuture<'static>>>),
        ),
        WampError,
    > {
        let config = cfg.unwrap_or_default();

        let (ctl_channel, ctl_receiver) = mpsc::unbounded_channel();
        let (core_res_w, core_res) = mpsc::unbounded_channel();

        let ctl_sender = ctl_channel.clone();
        let mut conn = Core::with_transport(sock, serializer_type, (ctl_sender, ctl_receiver), core_res_w)?;

        let rpc_evt_queue = if config.roles.contains(&ClientRole::Callee) {
            conn.rpc_event_queue_r.take()
        } else {
            None
        };

        Ok((
            Client {
                config,
                base_uri: Url::parse("wamp://mock.invalid/").unwrap(),
                session_id: None,
                welcome_details: WampDict::new(),
                ctl_channel,
                core_res,
                core_status: ClientState::NoEventLoop,
            },
            (Box::pin(conn.event_loop()), rpc_evt_queue),
        ))
    }

    async fn ready_to_send(&mut self) -> Result<(), WampError> {
        if let ClientState::NoEventLoop = self.get_cur_status() {
            debug!("Called before the event loop was ready, waiting...");
            self.wait_for_status_change().await;
        }

        if !self.is_connected() {
            return Err(WampError::ClientClosed);
        }
        Ok(())
    }

    async fn do_join(&mut self, uri: Url, keyring: Option<AuthKeyring>) -> Result<(), WampError> {
        self.ready_to_send().await?;

        if self.session_id.is_some() {
            return Err(WampError::UnknownError(format!(
                "join_realm('{}'): client has already joined a realm",
                uri
            )));
        }

        let agent_str = if self.config.agent.is_empty() { None } else { Some(self.config.agent.clone()) };

        let (res, result) = oneshot::channel();
        self.ctl_channel
            .send(Request::Join { uri, roles: self.config.roles.clone(), agent_str, keyring, res })
            .map_err(|_| WampError::ClientDied)?;

        let joined = result.await.map_err(|_| WampError::ClientDied)??;
        self.session_id = Some(joined.session_id);
        self.welcome_details = joined.details;
        debug!("Connected with session_id {} !", joined.session_id);
        Ok(())
    }

    /// Joins a realm anonymously.
    pub async fn join_realm<T: AsRef<str>>(&mut self, realm: T) -> Result<(), WampError> {
        let uri = self.realm_url(realm.as_ref())?;
        self.do_join(uri, None).await
    }

    /// Joins a realm, authenticating with the given plug-ins. `auth_id` is
    /// required unless every plug-in is anonymous.
    pub async fn join_realm_with_authentication<T: AsRef<str>>(
        &mut self,
        realm: T,
        methods: Vec<Box<dyn AuthMethod>>,
        auth_id: Option<String>,
    ) -> Result<(), WampError> {
        let keyring = AuthKeyring::new(methods, auth_id)?;
        let uri = self.realm_url(realm.as_ref())?;
        self.do_join(uri, Some(keyring)).await
    }

    /// Convenience wrapper around [`join_realm_with_authentication`](Client::join_realm_with_authentication)
    /// for the common cryptosign-only case.
    pub async fn join_realm_with_cryptosign<Realm: AsRef<str>, AuthId: Into<String>>(
        &mut self,
        realm: Realm,
        auth_id: AuthId,
        secret_key_hex: String,
    ) -> Result<(), WampError> {
        let cs = CryptoSign::new(secret_key_hex);
        self.join_realm_with_authentication(realm, vec![Box::new(cs)], Some(auth_id.into())).await
    }

    fn realm_url(&self, realm: &str) -> Result<Url, WampError> {
        // Reuses the connect() uri's scheme/host/port; only the realm (path) differs.
        let base = self.base_uri.clone();
        let mut uri = base;
        uri.set_path(realm);
        Ok(uri)
    }

    /// The session id assigned by WELCOME, once joined.
    pub fn session_id(&self) -> Option<WampId> {
        self.session_id
    }

    /// The `details` dict the router sent in WELCOME.
    pub fn welcome_details(&self) -> &WampDict {
        &self.welcome_details
    }

    /// Leaves the current realm and terminates the session with the server
    pub async fn leave_realm(&mut self) -> Result<(), WampError> {
        if !self.is_connected() {
            return Err(WampError::ClientClosed);
        }

        if self.session_id.take().is_none() {
            return Ok(());
        }

        let (res, result) = oneshot::channel();
        self.ctl_channel.send(Request::Leave { res }).map_err(|_| WampError::ClientDied)?;
        result.await.map_err(|_| WampError::ClientDied)??;
        Ok(())
    }

    /// Subscribes to events for the specified topic.
    ///
    /// Returns a subscription id (needed to unsubscribe) and the receiving
    /// end of a channel delivering published events.
    pub async fn subscribe<T: AsRef<str>>(
        &self,
        topic: T,
        options: SubscribeOptions,
    ) -> Result<(WampId, SubscriptionQueue), WampError> {
        let (res, result) = oneshot::channel();
        self.ctl_channel
            .send(Request::Subscribe {
                uri: topic.as_ref().to_owned(),
                options: options.get_dict().unwrap_or_default(),
                res,
            })
            .map_err(|_| WampError::ClientDied)?;

        result.await.map_err(|_| WampError::ClientDied)?
    }

    /// Unsubscribes from a previously subscribed topic
    pub async fn unsubscribe(&self, sub_id: WampId) -> Result<(), WampError> {
        let (res, result) = oneshot::channel();
        self.ctl_channel.send(Request::Unsubscribe { sub_id, res }).map_err(|_| WampError::ClientDied)?;
        result.await.map_err(|_| WampError::ClientDied)?
    }

    /// Publishes an event on a specific topic. Returns a publication id only
    /// if `options` asked for one via `with_acknowledge(true)`.
    pub async fn publish<T: AsRef<str>>(
        &self,
        topic: T,
        options: PublishOptions,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    ) -> Result<Option<WampId>, WampError> {
        let (res, result) = oneshot::channel();
        self.ctl_channel
            .send(Request::Publish {
                uri: topic.as_ref().to_owned(),
                options: options.get_dict().unwrap_or_default(),
                arguments,
                arguments_kw,
                res,
            })
            .map_err(|_| WampError::ClientDied)?;

        result.await.map_err(|_| WampError::ClientDied)?
    }

    /// Registers an RPC endpoint. On success, returns a registration id
    /// (needed to unregister). Calls received from the server are handed to
    /// `func_ptr` as an [`Invocation`]; the resulting futures are pushed onto
    /// the RPC event queue returned by [`Client::connect`], which the caller
    /// must drive with a separate spawned task.
    pub async fn register<T, F, Fut>(&self, uri: T, options: RegisterOptions, func_ptr: F) -> Result<WampId, WampError>
    where
        T: AsRef<str>,
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<InvocationResult, WampError>> + Send + 'static,
    {
        let func_ptr: RpcFunc = Box::new(move |invocation| Box::pin(func_ptr(invocation)));

        let (res, result) = oneshot::channel();
        self.ctl_channel
            .send(Request::Register {
                uri: uri.as_ref().to_owned(),
                options: options.get_dict().unwrap_or_default(),
                func_ptr,
                res,
            })
            .map_err(|_| WampError::ClientDied)?;

        result.await.map_err(|_| WampError::ClientDied)?
    }

    /// Unregisters an RPC endpoint
    pub async fn unregister(&self, rpc_id: WampId) -> Result<(), WampError> {
        let (res, result) = oneshot::channel();
        self.ctl_channel.send(Request::Unregister { rpc_id, res }).map_err(|_| WampError::ClientDied)?;
        result.await.map_err(|_| WampError::ClientDied)?
    }

    /// Prepares a call to a registered RPC endpoint. Nothing is sent to the
    /// server until the returned [`Call`]'s `progress`/`result`/`cancel` is
    /// first awaited.
    pub fn call<T: AsRef<str>>(
        &self,
        uri: T,
        options: CallOptions,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    ) -> Call {
        Call::new(self.ctl_channel.clone(), uri.as_ref().to_owned(), options.get_dict().unwrap_or_default(), arguments, arguments_kw)
    }

    /// Returns the current client status
    pub fn get_cur_status(&mut self) -> &ClientState {
        let new_status = self.core_res.recv().now_or_never();
        #[allow(clippy::match_wild_err_arm)]
        match new_status {
            Some(Some(state)) => self.set_next_status(state),
            None => &self.core_status,
            Some(None) => panic!("The event loop died without sending a new status"),
        }
    }

    /// Returns whether we are connected to the server or not
    pub fn is_connected(&mut self) -> bool {
        matches!(self.get_cur_status(), ClientState::Running)
    }

    fn set_next_status(&mut self, new_status: Result<(), WampError>) -> &ClientState {
        if new_status.is_err() {
            self.core_status = ClientState::Disconnected(new_status);
            return &self.core_status;
        }

        match self.core_status {
            ClientState::NoEventLoop => {
                self.core_status = ClientState::Running;
            }
            ClientState::Running => {
                self.core_status = ClientState::Disconnected(new_status);
            }
            ClientState::Disconnected(_) => {
                panic!("Got new core status after already being disconnected");
            }
        }

        &self.core_status
    }

    /// Waits until the event loop sends a status change event, updating
    /// `core_status`.
    async fn wait_for_status_change(&mut self) -> &ClientState {
        if let ClientState::Disconnected(ref _r) = self.core_status {
            return &self.core_status;
        }

        let new_status = match self.core_res.recv().await {
            Some(v) => v,
            None => panic!("The event loop died without sending a new status"),
        };

        self.set_next_status(new_status)
    }

    /// Blocks the caller until the connection with the server is terminated
    pub async fn block_until_disconnect(&mut self) -> &ClientState {
        let mut cur_status = self.get_cur_status();
        loop {
            match cur_status {
                ClientState::Disconnected(_) => break,
                _ => cur_status = self.wait_for_status_change().await,
            }
        }

        &self.core_status
    }

    /// Cleanly closes a connection with the server
    pub async fn disconnect(mut self) {
        if self.is_connected() {
            let _ = self.leave_realm().await;
            let _ = self.ctl_channel.send(Request::Shutdown);

            match self.core_res.recv().await {
                Some(Err(e)) => error!("Error while shutting down : {:?}", e),
                None => error!("Core never sent a status after shutting down..."),
                _ => {}
            }
        }
    }
}
