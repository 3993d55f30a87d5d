use std::collections::HashSet;

use log::*;
use tokio::sync::oneshot;
use tokio::sync::oneshot::Sender;

use super::{Core, OngoingCall, PendingRegisterResult, PendingSubResult, Status};
use crate::auth::{AuthKeyring, AuthenticateOutcome, Challenge};
use crate::call::CallHandle;
use crate::common::*;
use crate::error::*;
use crate::invocation::RpcFunc;
use crate::message::*;

/// What a successful `join_realm` hands back to the caller.
pub struct JoinRealmResult {
    pub session_id: WampId,
    pub details: WampDict,
}

/// What a `Call` handle's progress/final channels eventually carry.
pub type CallResult = Result<(Option<WampArgs>, Option<WampKwArgs>), WampError>;

/// The one channel through which every piece of the public API (and the
/// invocation progress/result callbacks spawned for registered RPCs) talks
/// to the event loop.
pub enum Request {
    Shutdown,
    Join {
        uri: url::Url,
        roles: HashSet<ClientRole>,
        agent_str: Option<String>,
        keyring: Option<AuthKeyring>,
        res: Sender<Result<JoinRealmResult, WampError>>,
    },
    Leave {
        res: Sender<Result<(), WampError>>,
    },
    Subscribe {
        uri: WampUri,
        options: WampDict,
        res: PendingSubResult,
    },
    Unsubscribe {
        sub_id: WampId,
        res: Sender<Result<(), WampError>>,
    },
    Publish {
        uri: WampUri,
        options: WampDict,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
        res: Sender<Result<Option<WampId>, WampError>>,
    },
    Register {
        uri: WampUri,
        options: WampDict,
        func_ptr: RpcFunc,
        res: PendingRegisterResult,
    },
    Unregister {
        rpc_id: WampId,
        res: Sender<Result<(), WampError>>,
    },
    Call {
        uri: WampUri,
        options: WampDict,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
        res: Sender<Result<CallHandle, WampError>>,
    },
    Cancel {
        request: WampId,
        mode: CancelMode,
        res: Sender<Result<(), WampError>>,
    },
    /// Pushed by a running invocation handler's `send_progress`.
    InvocationProgress {
        request: WampId,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    },
    /// Pushed once an invocation handler future resolves.
    InvocationResult {
        request: WampId,
        res: Result<crate::invocation::InvocationResult, WampError>,
    },
}

/// Builds the HELLO `details` dict advertising our roles and, if a keyring
/// was supplied, our auth methods/id/extra.
fn hello_details(roles: &HashSet<ClientRole>, agent_str: &Option<String>, keyring: &Option<AuthKeyring>) -> WampDict {
    let mut details = WampDict::new();

    let mut role_dict = WampDict::new();
    for role in roles {
        let mut features = WampDict::new();
        for feature in ADVERTISED_FEATURES {
            features.insert((*feature).to_owned(), Arg::Bool(true));
        }
        role_dict.insert(role.as_str().to_owned(), Arg::Dict(features));
    }
    details.insert("roles".to_owned(), Arg::Dict(role_dict));

    if let Some(agent) = agent_str {
        details.insert("agent".to_owned(), Arg::String(agent.clone()));
    }

    if let Some(keyring) = keyring {
        let methods: Vec<Arg> = keyring.method_names().iter().map(|m| Arg::String((*m).to_owned())).collect();
        details.insert("authmethods".to_owned(), Arg::List(methods));

        if let Some(auth_id) = keyring.auth_id() {
            details.insert("authid".to_owned(), Arg::String(auth_id.to_owned()));
        }
        if let Some(extra) = keyring.auth_extra() {
            details.insert("authextra".to_owned(), Arg::Dict(extra.clone()));
        }
    }

    details
}

/// Drives HELLO -> [CHALLENGE -> AUTHENTICATE]* -> WELCOME.
pub async fn join_realm(
    core: &mut Core,
    uri: url::Url,
    roles: HashSet<ClientRole>,
    agent_str: Option<String>,
    keyring: Option<AuthKeyring>,
    res: Sender<Result<JoinRealmResult, WampError>>,
) -> Status {
    let realm = uri.path().trim_start_matches('/').to_owned();
    let details = hello_details(&roles, &agent_str, &keyring);

    if let Err(e) = core.send(&Msg::Hello { realm, details }).await {
        let _ = res.send(Err(e));
        return Status::Shutdown;
    }

    loop {
        let msg = match core.recv().await {
            Ok(m) => m,
            Err(e) => {
                let _ = res.send(Err(e));
                return Status::Shutdown;
            }
        };

        match msg {
            Msg::Welcome { session, details } => {
                core.valid_session = true;
                let _ = res.send(Ok(JoinRealmResult { session_id: session, details }));
                return Status::Ok;
            }
            Msg::Abort { reason, details } => {
                let _ = res.send(Err(WampError::AbortError(reason, details)));
                return Status::Shutdown;
            }
            Msg::Challenge { auth_method, extra } => {
                let keyring = match &keyring {
                    Some(k) => k,
                    None => {
                        let _ = res.send(Err(WampError::AuthError(
                            "server sent CHALLENGE but no auth keyring was configured".into(),
                        )));
                        return Status::Shutdown;
                    }
                };

                let method = match keyring.get(&auth_method) {
                    Some(m) => m,
                    None => {
                        let _ = res.send(Err(WampError::AuthError(format!(
                            "server challenged for unsupported method '{}'",
                            auth_method
                        ))));
                        return Status::Shutdown;
                    }
                };

                let outcome = method.authenticate(&Challenge { auth_method: auth_method.clone(), extra });
                let outcome = match outcome {
                    Ok(o) => o,
                    Err(e) => {
                        let _ = res.send(Err(e));
                        return Status::Shutdown;
                    }
                };

                match outcome {
                    AuthenticateOutcome::Authenticate { signature, extra } => {
                        if let Err(e) = core.send(&Msg::Authenticate { signature, extra }).await {
                            let _ = res.send(Err(e));
                            return Status::Shutdown;
                        }
                    }
                    AuthenticateOutcome::Abort { reason, details } => {
                        let _ = core.send(&Msg::Abort { details: details.clone(), reason: reason.clone() }).await;
                        let _ = res.send(Err(WampError::AbortError(reason, details)));
                        return Status::Shutdown;
                    }
                }
            }
            other => {
                let _ = res.send(Err(WampError::UnexpectedMessage(format!(
                    "expected WELCOME, ABORT or CHALLENGE during join, got {:?}",
                    other.code()
                ))));
                return Status::Shutdown;
            }
        }
    }
}

pub async fn leave_realm(core: &mut Core, res: Sender<Result<(), WampError>>) -> Status {
    if !core.valid_session {
        let _ = res.send(Ok(()));
        return Status::Ok;
    }

    core.valid_session = false;
    if let Err(e) = core
        .send(&Msg::Goodbye { details: WampDict::new(), reason: CLOSE_GOODBYE_AND_OUT.to_owned() })
        .await
    {
        let _ = res.send(Err(e));
        return Status::Shutdown;
    }

    // Per spec, the peer should echo its own GOODBYE; we don't block on it.
    let _ = res.send(Ok(()));
    Status::Ok
}

pub async fn subscribe(core: &mut Core, uri: WampUri, options: WampDict, res: PendingSubResult) -> Status {
    let request = core.create_request();
    core.pending_sub.insert(request, res);

    if let Err(e) = core.send(&Msg::Subscribe { request, options, topic: uri }).await {
        if let Some(res) = core.pending_sub.remove(&request) {
            let _ = res.send(Err(e));
        }
        return Status::Shutdown;
    }
    Status::Ok
}

pub async fn unsubscribe(core: &mut Core, sub_id: WampId, res: Sender<Result<(), WampError>>) -> Status {
    if core.subscriptions.remove(&sub_id).is_none() {
        let _ = res.send(Err(WampError::UnknownError(format!("not subscribed to {}", sub_id))));
        return Status::Ok;
    }

    let request = core.create_request();
    core.pending_transactions.insert(request, res);

    if let Err(e) = core.send(&Msg::Unsubscribe { request, subscription: sub_id }).await {
        if let Some(res) = core.pending_transactions.remove(&request) {
            let _ = res.send(Err(e));
        }
        return Status::Shutdown;
    }
    Status::Ok
}

pub async fn publish(
    core: &mut Core,
    uri: WampUri,
    options: WampDict,
    arguments: Option<WampArgs>,
    arguments_kw: Option<WampKwArgs>,
    res: Sender<Result<Option<WampId>, WampError>>,
) -> Status {
    let wants_ack = matches!(options.get("acknowledge"), Some(Arg::Bool(true)));
    let request = core.create_request();

    if let Err(e) = core.send(&Msg::Publish { request, options, topic: uri, arguments, arguments_kw }).await {
        let _ = res.send(Err(e));
        return Status::Shutdown;
    }

    if wants_ack {
        core.pending_publish_ack.insert(request, res);
    } else {
        let _ = res.send(Ok(None));
    }
    Status::Ok
}

pub async fn register(
    core: &mut Core,
    uri: WampUri,
    options: WampDict,
    res: PendingRegisterResult,
    func_ptr: RpcFunc,
) -> Status {
    let request = core.create_request();
    core.pending_register.insert(request, (func_ptr, res));

    if let Err(e) = core.send(&Msg::Register { request, options, procedure: uri }).await {
        if let Some((_, res)) = core.pending_register.remove(&request) {
            let _ = res.send(Err(e));
        }
        return Status::Shutdown;
    }
    Status::Ok
}

pub async fn unregister(core: &mut Core, rpc_id: WampId, res: Sender<Result<(), WampError>>) -> Status {
    if core.rpc_endpoints.remove(&rpc_id).is_none() {
        let _ = res.send(Err(WampError::UnknownError(format!("no such registration {}", rpc_id))));
        return Status::Ok;
    }

    let request = core.create_request();
    core.pending_transactions.insert(request, res);

    if let Err(e) = core.send(&Msg::Unregister { request, registration: rpc_id }).await {
        if let Some(res) = core.pending_transactions.remove(&request) {
            let _ = res.send(Err(e));
        }
        return Status::Shutdown;
    }
    Status::Ok
}

pub async fn call(
    core: &mut Core,
    uri: WampUri,
    options: WampDict,
    arguments: Option<WampArgs>,
    arguments_kw: Option<WampKwArgs>,
    res: Sender<Result<CallHandle, WampError>>,
) -> Status {
    let request = core.create_request();
    let (progress_tx, progress_rx) = tokio::sync::mpsc::unbounded_channel();
    let (final_tx, final_rx) = oneshot::channel();

    if let Err(e) = core.send(&Msg::Call { request, options, procedure: uri, arguments, arguments_kw }).await {
        let _ = res.send(Err(e));
        return Status::Shutdown;
    }

    core.ongoing_calls.insert(request, OngoingCall { progress_tx, final_tx: Some(final_tx) });
    let _ = res.send(Ok(CallHandle { request, progress_rx, final_rx }));
    Status::Ok
}

pub async fn cancel(core: &mut Core, request: WampId, mode: CancelMode, res: Sender<Result<(), WampError>>) -> Status {
    if !core.ongoing_calls.contains_key(&request) {
        let _ = res.send(Err(WampError::UnknownError(format!("no ongoing call with request id {}", request))));
        return Status::Ok;
    }

    let mut options = WampDict::new();
    options.insert("mode".to_owned(), Arg::String(mode.as_str().to_owned()));

    let send_res = core.send(&Msg::Cancel { request, options }).await;
    let _ = res.send(send_res);
    Status::Ok
}

pub async fn invoke_progress(
    core: &mut Core,
    request: WampId,
    arguments: Option<WampArgs>,
    arguments_kw: Option<WampKwArgs>,
) -> Status {
    let mut options = WampDict::new();
    options.insert("progress".to_owned(), Arg::Bool(true));

    if let Err(e) = core.send(&Msg::Yield { request, options, arguments, arguments_kw }).await {
        warn!("Failed to send progressive YIELD for request {}: {:?}", request, e);
    }
    Status::Ok
}

pub async fn invoke_yield(
    core: &mut Core,
    request: WampId,
    res: Result<crate::invocation::InvocationResult, WampError>,
) -> Status {
    core.running_invocations.remove(&request);

    let outcome = match res {
        Ok(result) => {
            core.send(&Msg::Yield {
                request,
                options: WampDict::new(),
                arguments: result.arguments,
                arguments_kw: result.arguments_kw,
            })
            .await
        }
        Err(e) => {
            let (uri, details, arguments, arguments_kw) = match e {
                WampError::ErrorResponse(uri, details, arguments, arguments_kw) => (uri, details, arguments, arguments_kw),
                other => (ERR_RUNTIME_ERROR.to_owned(), WampDict::new(), Some(vec![Arg::String(other.to_string())]), None),
            };
            core.send(&Msg::Error {
                request_type: INVOCATION as WampInteger,
                request,
                details,
                error: uri,
                arguments,
                arguments_kw,
            })
            .await
        }
    };

    if let Err(e) = outcome {
        warn!("Failed to send invocation outcome for request {}: {:?}", request, e);
    }
    Status::Ok
}
