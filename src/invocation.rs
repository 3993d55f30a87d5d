//! Callee-side materialization of an RPC call. Grounded on the reference
//! implementation's `RpcFunc`/`rpc_event_queue` plumbing in `core::mod`, with
//! progress and interrupt support added per the advanced profile.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Notify;

use crate::common::CancelMode;
use crate::core::Request;
use crate::error::WampError;
use crate::message::{WampArgs, WampDict, WampId, WampKwArgs, WampUri};

/// A callee's return value, normalized to positional + keyword arguments.
#[derive(Clone, Debug, Default)]
pub struct InvocationResult {
    pub arguments: Option<WampArgs>,
    pub arguments_kw: Option<WampKwArgs>,
}

impl InvocationResult {
    pub fn empty() -> Self {
        InvocationResult::default()
    }

    pub fn args(arguments: WampArgs) -> Self {
        InvocationResult { arguments: Some(arguments), arguments_kw: None }
    }

    pub fn new(arguments: Option<WampArgs>, arguments_kw: Option<WampKwArgs>) -> Self {
        InvocationResult { arguments, arguments_kw }
    }
}

/// The signal delivered to a running handler when the router sends INTERRUPT.
/// Tokio tasks aren't preemptible at every suspension point the way a Python
/// coroutine is, so this is a cooperative primitive the handler must poll.
#[derive(Clone)]
pub struct Interrupt {
    notify: Arc<Notify>,
    mode: Arc<Mutex<CancelMode>>,
}

impl Interrupt {
    pub(crate) fn new() -> (Interrupt, InterruptSource) {
        let notify = Arc::new(Notify::new());
        let mode = Arc::new(Mutex::new(CancelMode::default()));
        (
            Interrupt { notify: notify.clone(), mode: mode.clone() },
            InterruptSource { notify, mode },
        )
    }

    /// Resolves once the router sends an INTERRUPT for this invocation, with
    /// the cancel mode it carried.
    pub async fn cancelled(&self) -> CancelMode {
        self.notify.notified().await;
        *self.mode.lock().unwrap()
    }
}

pub(crate) struct InterruptSource {
    notify: Arc<Notify>,
    mode: Arc<Mutex<CancelMode>>,
}

impl InterruptSource {
    pub fn interrupt(&self, mode: CancelMode) {
        *self.mode.lock().unwrap() = mode;
        self.notify.notify_one();
    }
}

/// Passed to a registered handler on INVOCATION. `request`/`registration`
/// identify the invocation; `interrupt` resolves if the router cancels it.
pub struct Invocation {
    pub request: WampId,
    pub registration: WampId,
    pub procedure: Option<WampUri>,
    pub arguments: Option<WampArgs>,
    pub arguments_kw: Option<WampKwArgs>,
    pub details: WampDict,
    pub interrupt: Interrupt,
    progress_tx: UnboundedSender<Request>,
}

impl Invocation {
    pub(crate) fn new(
        request: WampId,
        registration: WampId,
        procedure: Option<WampUri>,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
        details: WampDict,
        interrupt: Interrupt,
        progress_tx: UnboundedSender<Request>,
    ) -> Invocation {
        Invocation {
            request,
            registration,
            procedure,
            arguments,
            arguments_kw,
            details,
            interrupt,
            progress_tx,
        }
    }

    pub fn caller_id(&self) -> Option<WampId> {
        self.details.get("caller").and_then(|v| v.as_u64())
    }

    /// Whether the caller set `receive_progress` in its CALL options.
    pub fn receive_progress(&self) -> bool {
        matches!(self.details.get("receive_progress").and_then(|v| v.as_bool()), Some(true))
    }

    /// Sends an intermediate YIELD with `options.progress=true`. Fails if the
    /// caller never asked for progressive results.
    pub fn send_progress(&self, result: InvocationResult) -> Result<(), WampError> {
        if !self.receive_progress() {
            return Err(WampError::ProtocolError(
                "caller did not set receive_progress but the handler sent a progress result".into(),
            ));
        }
        self.progress_tx
            .send(Request::InvocationProgress {
                request: self.request,
                arguments: result.arguments,
                arguments_kw: result.arguments_kw,
            })
            .map_err(|_| WampError::ClientClosed)
    }
}

/// A callee handler: takes the invocation and returns a future resolving to
/// the final result (or an error, sent back as ERROR). Boxed closures must be
/// `'static` since the returned future is driven by a spawned task.
pub type RpcFunc = Box<
    dyn Fn(Invocation) -> Pin<Box<dyn Future<Output = Result<InvocationResult, WampError>> + Send>>
        + Send
        + Sync,
>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_result_builders() {
        assert!(InvocationResult::empty().arguments.is_none());
        let r = InvocationResult::args(vec![1i64.into()]);
        assert_eq!(r.arguments.unwrap().len(), 1);
    }
}
