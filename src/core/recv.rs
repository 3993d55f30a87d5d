use log::*;

use super::{Core, Status};
use crate::common::*;
use crate::error::*;
use crate::message::*;

pub async fn subscribed(core: &mut Core, request: WampId, sub_id: WampId) -> Status {
    if let Some(res) = core.pending_sub.remove(&request) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        core.subscriptions.insert(sub_id, tx);
        let _ = res.send(Ok((sub_id, rx)));
    } else {
        warn!("Received SUBSCRIBED for unknown request {}", request);
    }
    Status::Ok
}

pub async fn unsubscribed(core: &mut Core, request: WampId) -> Status {
    if let Some(res) = core.pending_transactions.remove(&request) {
        let _ = res.send(Ok(()));
    } else {
        warn!("Received UNSUBSCRIBED for unknown request {}", request);
    }
    Status::Ok
}

pub async fn published(core: &mut Core, request: WampId, publication: WampId) -> Status {
    if let Some(res) = core.pending_publish_ack.remove(&request) {
        let _ = res.send(Ok(Some(publication)));
    } else {
        warn!("Received PUBLISHED for unknown/unacknowledged request {}", request);
    }
    Status::Ok
}

pub async fn event(
    core: &mut Core,
    subscription: WampId,
    publication: WampId,
    _details: WampDict,
    arguments: Option<WampArgs>,
    arguments_kw: Option<WampKwArgs>,
) -> Status {
    match core.subscriptions.get(&subscription) {
        Some(tx) => {
            if tx.send((publication, arguments, arguments_kw)).is_err() {
                // Consumer dropped its receiver; leave cleanup to an explicit unsubscribe.
                debug!("Dropping EVENT for subscription {} with no listening consumer", subscription);
            }
        }
        None => warn!("Received EVENT for unknown subscription {}", subscription),
    }
    Status::Ok
}

pub async fn registered(core: &mut Core, request: WampId, registration: WampId) -> Status {
    match core.pending_register.remove(&request) {
        Some((func, res)) => {
            core.rpc_endpoints.insert(registration, func);
            let _ = res.send(Ok(registration));
        }
        None => warn!("Received REGISTERED for unknown request {}", request),
    }
    Status::Ok
}

pub async fn unregistered(core: &mut Core, request: WampId) -> Status {
    if let Some(res) = core.pending_transactions.remove(&request) {
        let _ = res.send(Ok(()));
    } else {
        warn!("Received UNREGISTERED for unknown request {}", request);
    }
    Status::Ok
}

pub async fn invocation(
    core: &mut Core,
    request: WampId,
    registration: WampId,
    details: WampDict,
    arguments: Option<WampArgs>,
    arguments_kw: Option<WampKwArgs>,
) -> Status {
    core.dispatch_invocation(request, registration, details, arguments, arguments_kw);
    Status::Ok
}

pub async fn interrupt(core: &mut Core, request: WampId, options: WampDict) -> Status {
    let mode = match options.get("mode").and_then(|v| v.as_str()) {
        Some("skip") => CancelMode::Skip,
        Some("kill") => CancelMode::Kill,
        _ => CancelMode::KillNoWait,
    };

    match core.running_invocations.get(&request) {
        Some(source) => source.interrupt(mode),
        None => warn!("Received INTERRUPT for unknown/completed invocation {}", request),
    }
    Status::Ok
}

pub async fn call_result(
    core: &mut Core,
    request: WampId,
    details: WampDict,
    arguments: Option<WampArgs>,
    arguments_kw: Option<WampKwArgs>,
) -> Status {
    let is_progress = matches!(details.get("progress"), Some(Arg::Bool(true)));

    if is_progress {
        match core.ongoing_calls.get_mut(&request) {
            Some(ongoing) => {
                let _ = ongoing.progress_tx.send((arguments, arguments_kw));
            }
            None => warn!("Received progressive RESULT for unknown/completed call {}", request),
        }
    } else {
        match core.ongoing_calls.remove(&request) {
            Some(ongoing) => {
                if let Some(final_tx) = ongoing.final_tx {
                    let _ = final_tx.send(Ok((arguments, arguments_kw)));
                }
            }
            None => warn!("Received RESULT for unknown/completed call {}", request),
        }
    }
    Status::Ok
}

pub async fn goodbye(core: &mut Core, _details: WampDict, reason: WampUri) -> Status {
    debug!("Peer said GOODBYE: {}", reason);
    if core.valid_session {
        core.valid_session = false;
        let _ = core
            .send(&Msg::Goodbye { details: WampDict::new(), reason: CLOSE_GOODBYE_AND_OUT.to_owned() })
            .await;
    }
    Status::Shutdown
}

pub async fn abort(_core: &mut Core, details: WampDict, reason: WampUri) -> Status {
    error!("Peer sent ABORT: {} {:?}", reason, details);
    Status::Shutdown
}

pub async fn error(
    core: &mut Core,
    request_type: WampInteger,
    request: WampId,
    details: WampDict,
    error: WampUri,
    arguments: Option<WampArgs>,
    arguments_kw: Option<WampKwArgs>,
) -> Status {
    let err = WampError::error_response(error, details, arguments, arguments_kw);

    match request_type as u64 {
        SUBSCRIBE => {
            if let Some(res) = core.pending_sub.remove(&request) {
                let _ = res.send(Err(err));
            }
        }
        UNSUBSCRIBE => {
            if let Some(res) = core.pending_transactions.remove(&request) {
                let _ = res.send(Err(err));
            }
        }
        PUBLISH => {
            if let Some(res) = core.pending_publish_ack.remove(&request) {
                let _ = res.send(Err(err));
            }
        }
        REGISTER => {
            if let Some((_, res)) = core.pending_register.remove(&request) {
                let _ = res.send(Err(err));
            }
        }
        UNREGISTER => {
            if let Some(res) = core.pending_transactions.remove(&request) {
                let _ = res.send(Err(err));
            }
        }
        CALL | CANCEL => {
            if let Some(ongoing) = core.ongoing_calls.remove(&request) {
                if let Some(final_tx) = ongoing.final_tx {
                    let _ = final_tx.send(Err(err));
                }
            }
        }
        other => warn!("Received ERROR for unhandled request_type {}: {:?}", other, err),
    }
    Status::Ok
}
