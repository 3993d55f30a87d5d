use quick_error::*;
use url::ParseError;

use crate::message::{WampArgs, WampDict, WampId, WampKwArgs, WampUri};
use crate::serializer::SerializerError;
use crate::transport::TransportError;

quick_error! {
    /// Errors a WAMP client can encounter.
    #[derive(Debug)]
    pub enum WampError {
        UnknownError(e: String) {
            from()
            display("unhandled error: {}", e)
        }
        /// Error with the transport connection.
        ConnectionError(e: TransportError) {
            from()
            source(e)
            display("an error occurred with the connection: ({})", e)
        }
        /// Error while [de]serializing a message.
        SerializationError(e: SerializerError) {
            from()
            source(e)
            display("an error occurred while [de]serializing a message: ({})", e)
        }
        /// A message's sequence representation was malformed or used an
        /// unknown type code.
        InvalidMessage(e: String) {
            display("received an invalid message: {}", e)
        }
        /// A message was well-formed but not permitted at this point in the
        /// session lifecycle (subkind of InvalidMessage).
        UnexpectedMessage(e: String) {
            display("received an unexpected message: {}", e)
        }
        /// WAMP uri is invalid.
        InvalidUri(e: ParseError) {
            source(e)
            display("the uri provided could not be parsed: {}", e)
        }
        /// Server uri is invalid.
        NoHostInUri {
            display("the uri provided did not contain a host address")
        }
        /// Received ABORT during connect/join.
        AbortError(reason: WampUri, details: WampDict) {
            context(reason: WampUri, details: WampDict) -> (reason, details)
            display("peer aborted the session: {} {:?}", reason, details)
        }
        /// An auth plug-in rejected a challenge, or no plug-in matched the
        /// requested auth method.
        AuthError(e: String) {
            display("authentication failed: {}", e)
        }
        /// The server replied with an ERROR message.
        ErrorResponse(uri: WampUri, details: WampDict, arguments: Option<WampArgs>, arguments_kw: Option<WampKwArgs>) {
            display("the server returned an error: {} {:?}", uri, details)
        }
        /// The client was closed while the operation was in flight.
        ClientClosed {
            display("the client was closed while this operation was pending")
        }
        /// The client has been dropped while the event loop was running.
        ClientDied {
            display("the client has exited without sending Shutdown")
        }
        /// A randomly generated request id was not unique.
        RequestIdCollision {
            display("there was a collision with a unique request id")
        }
        /// A protocol-level violation not covered by a more specific variant.
        ProtocolError(e: String) {
            display("a WAMP protocol violation was detected: {}", e)
        }
    }
}

impl WampError {
    pub fn error_response(uri: WampUri, details: WampDict, arguments: Option<WampArgs>, arguments_kw: Option<WampKwArgs>) -> WampError {
        WampError::ErrorResponse(uri, details, arguments, arguments_kw)
    }

    /// True for `ErrorResponse(wamp.error.canceled, ...)`, recognized
    /// specifically by the call cancellation path.
    pub fn is_canceled(&self) -> bool {
        matches!(self, WampError::ErrorResponse(uri, ..) if uri == crate::common::ERR_CANCELED)
    }

    /// Classifies an `ErrorResponse` uri into the well-known reserved-URI
    /// buckets. Unknown URIs classify as `Other`, playing the role the
    /// URI→class registry plays in an OO implementation.
    pub fn known_error(&self) -> Option<KnownError> {
        match self {
            WampError::ErrorResponse(uri, ..) => Some(KnownError::classify(uri)),
            _ => None,
        }
    }
}

/// Closed classification of the reserved `wamp.error.*` URIs, computed from
/// the URI string rather than via a URI→class registry of open subclasses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KnownError {
    InvalidUri,
    NoSuchProcedure,
    ProcedureAlreadyExists,
    NoSuchRegistration,
    NoSuchSubscription,
    InvalidArgument,
    NotAuthorized,
    AuthorizationFailed,
    NoSuchRealm,
    NoSuchRole,
    Canceled,
    OptionNotAllowed,
    NoEligibleCallee,
    RuntimeError,
    ProtocolViolation,
    OptionDisallowedDiscloseMe,
    NetworkFailure,
    Other,
}

impl KnownError {
    pub fn classify(uri: &str) -> KnownError {
        use crate::common::*;
        match uri {
            ERR_INVALID_URI => KnownError::InvalidUri,
            ERR_NO_SUCH_PROCEDURE => KnownError::NoSuchProcedure,
            ERR_PROCEDURE_ALREADY_EXISTS => KnownError::ProcedureAlreadyExists,
            ERR_NO_SUCH_REGISTRATION => KnownError::NoSuchRegistration,
            ERR_NO_SUCH_SUBSCRIPTION => KnownError::NoSuchSubscription,
            ERR_INVALID_ARGUMENT => KnownError::InvalidArgument,
            ERR_NOT_AUTHORIZED => KnownError::NotAuthorized,
            ERR_AUTHORIZATION_FAILED => KnownError::AuthorizationFailed,
            ERR_NO_SUCH_REALM => KnownError::NoSuchRealm,
            ERR_NO_SUCH_ROLE => KnownError::NoSuchRole,
            ERR_CANCELED => KnownError::Canceled,
            ERR_OPTION_NOT_ALLOWED => KnownError::OptionNotAllowed,
            ERR_NO_ELIGIBLE_CALLEE => KnownError::NoEligibleCallee,
            ERR_RUNTIME_ERROR => KnownError::RuntimeError,
            ERR_PROTOCOL_VIOLATION => KnownError::ProtocolViolation,
            ERR_OPTION_DISALLOWED_DISCLOSE_ME => KnownError::OptionDisallowedDiscloseMe,
            ERR_NETWORK_FAILURE => KnownError::NetworkFailure,
            _ => KnownError::Other,
        }
    }
}
