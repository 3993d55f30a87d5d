//! Lazy caller-side handle for an outstanding CALL. Grounded on the
//! reference implementation's `pending_call` oneshot plumbing in
//! `core::send`, extended with a progress queue and cancellation per the
//! advanced profile.

use tokio::sync::{mpsc, oneshot};

use crate::common::CancelMode;
use crate::core::Request;
use crate::error::WampError;
use crate::message::{WampArgs, WampDict, WampId, WampKwArgs, WampUri};

pub(crate) struct CallHandle {
    pub request: WampId,
    pub progress_rx: mpsc::UnboundedReceiver<(Option<WampArgs>, Option<WampKwArgs>)>,
    pub final_rx: oneshot::Receiver<Result<(Option<WampArgs>, Option<WampKwArgs>), WampError>>,
}

struct Sent {
    request: WampId,
    progress_rx: mpsc::UnboundedReceiver<(Option<WampArgs>, Option<WampKwArgs>)>,
    final_rx: oneshot::Receiver<Result<(Option<WampArgs>, Option<WampKwArgs>), WampError>>,
}

/// A pending RPC call. Exclusively owned by its creator. No CALL is written
/// to the transport until the first call to [`progress`](Call::progress) or
/// [`result`](Call::result).
pub struct Call {
    ctl: mpsc::UnboundedSender<Request>,
    procedure: WampUri,
    options: WampDict,
    arguments: Option<WampArgs>,
    arguments_kw: Option<WampKwArgs>,
    sent: Option<Sent>,
}

impl Call {
    pub(crate) fn new(
        ctl: mpsc::UnboundedSender<Request>,
        procedure: WampUri,
        options: WampDict,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    ) -> Call {
        Call { ctl, procedure, options, arguments, arguments_kw, sent: None }
    }

    async fn ensure_sent(&mut self) -> Result<(), WampError> {
        if self.sent.is_some() {
            return Ok(());
        }

        let (handle_tx, handle_rx) = oneshot::channel();
        self.ctl
            .send(Request::Call {
                uri: self.procedure.clone(),
                options: self.options.clone(),
                arguments: self.arguments.clone(),
                arguments_kw: self.arguments_kw.clone(),
                res: handle_tx,
            })
            .map_err(|_| WampError::ClientClosed)?;

        let handle = handle_rx.await.map_err(|_| WampError::ClientClosed)??;
        self.sent = Some(Sent {
            request: handle.request,
            progress_rx: handle.progress_rx,
            final_rx: handle.final_rx,
        });
        Ok(())
    }

    /// Awaits the next progressive RESULT. Returns `None` once no more
    /// progress will arrive (the caller should then await [`result`](Call::result)).
    pub async fn progress(&mut self) -> Result<Option<(Option<WampArgs>, Option<WampKwArgs>)>, WampError> {
        self.ensure_sent().await?;
        Ok(self.sent.as_mut().unwrap().progress_rx.recv().await)
    }

    /// Awaits the final RESULT or ERROR.
    pub async fn result(&mut self) -> Result<(Option<WampArgs>, Option<WampKwArgs>), WampError> {
        self.ensure_sent().await?;
        match (&mut self.sent.as_mut().unwrap().final_rx).await {
            Ok(r) => r,
            Err(_) => Err(WampError::ClientClosed),
        }
    }

    /// Sends a CANCEL for this call using the given mode. The final reply
    /// (normally `wamp.error.canceled`) is still available via [`result`](Call::result).
    pub async fn cancel(&mut self, mode: CancelMode) -> Result<(), WampError> {
        self.ensure_sent().await?;
        let request = self.sent.as_ref().unwrap().request;
        let (res, result) = oneshot::channel();
        self.ctl
            .send(Request::Cancel { request, mode, res })
            .map_err(|_| WampError::ClientClosed)?;
        result.await.map_err(|_| WampError::ClientClosed)?
    }
}
