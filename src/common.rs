use std::future::Future;
use std::pin::Pin;

use log::*;

pub use crate::message::*;

/// Returns whether a uri is valid or not (using strict rules: lower-case
/// alphanumeric/underscore tokens separated by dots, never starting with
/// the reserved `wamp.` prefix).
pub fn is_valid_strict_uri<T: AsRef<str>>(in_uri: T) -> bool {
    let uri: &str = in_uri.as_ref();
    let mut num_chars_token: usize = 0;
    if uri.starts_with("wamp.") {
        warn!("URI '{}' cannot start with 'wamp'", uri);
        return false;
    }

    for (i, c) in uri.chars().enumerate() {
        if c == '.' {
            if num_chars_token == 0 {
                warn!("URI '{}' contains a zero length token ending @ index {}", uri, i);
                return false;
            }
            num_chars_token = 0;
            continue;
        }

        num_chars_token += 1;

        if c == '_' {
            continue;
        }

        if !c.is_lowercase() && c.is_alphabetic() {
            warn!("URI '{}' contains a non lower case character @ index {}", uri, i);
            return false;
        }
        if !c.is_alphanumeric() {
            warn!("URI '{}' contains an invalid character @ index {}", uri, i);
            return false;
        }
    }

    num_chars_token > 0 || uri.is_empty()
}

/// How a subscription/registration URI is matched against an incoming
/// publish/call URI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatchPolicy {
    Exact,
    Prefix,
    Wildcard,
}

impl MatchPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchPolicy::Exact => "exact",
            MatchPolicy::Prefix => "prefix",
            MatchPolicy::Wildcard => "wildcard",
        }
    }
}

/// A URI together with an optional match policy. Equality/hashing are
/// string-equal; the policy is metadata used only by [`matches`](Uri::matches).
#[derive(Clone, Debug)]
pub struct Uri {
    value: String,
    policy: Option<MatchPolicy>,
}

impl Uri {
    pub fn exact<T: Into<String>>(value: T) -> Uri {
        Uri { value: value.into(), policy: None }
    }

    pub fn with_policy<T: Into<String>>(value: T, policy: MatchPolicy) -> Uri {
        Uri { value: value.into(), policy: Some(policy) }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy.unwrap_or(MatchPolicy::Exact)
    }

    /// Does this URI (acting as the registered pattern) match an incoming
    /// concrete URI `u`, per its match policy.
    pub fn matches(&self, u: &str) -> bool {
        match self.policy() {
            MatchPolicy::Exact => self.value == u,
            MatchPolicy::Prefix => Uri::prefix_match(&self.value, u),
            MatchPolicy::Wildcard => Uri::wildcard_match(&self.value, u),
        }
    }

    /// `U == P || U.startswith(P + ".")`
    pub fn prefix_match(p: &str, u: &str) -> bool {
        u == p || u.starts_with(&format!("{}.", p))
    }

    /// Equal component count, and every non-empty component of `p` equals
    /// the corresponding component of `u`.
    pub fn wildcard_match(p: &str, u: &str) -> bool {
        let p_parts: Vec<&str> = p.split('.').collect();
        let u_parts: Vec<&str> = u.split('.').collect();
        if p_parts.len() != u_parts.len() {
            return false;
        }
        p_parts
            .iter()
            .zip(u_parts.iter())
            .all(|(pp, up)| pp.is_empty() || pp == up)
    }
}

impl PartialEq for Uri {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
impl Eq for Uri {}
impl std::hash::Hash for Uri {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}
impl PartialEq<str> for Uri {
    fn eq(&self, other: &str) -> bool {
        self.value == other
    }
}
impl AsRef<str> for Uri {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

/// A boxed, pinned future; used for the event loop future returned by
/// `Client::connect` and for boxed handler futures throughout.
pub type GenericFuture<'a> = Pin<Box<dyn Future<Output = Result<(), crate::error::WampError>> + Send + 'a>>;

/// A role a client can advertise to the router in HELLO.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientRole {
    Publisher,
    Subscriber,
    Caller,
    Callee,
}

impl ClientRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientRole::Publisher => "publisher",
            ClientRole::Subscriber => "subscriber",
            ClientRole::Caller => "caller",
            ClientRole::Callee => "callee",
        }
    }
}

/// The ten advanced-profile features advertised for every role in HELLO, per
/// the unified feature list (multiple draft revisions disagreed; this is the
/// more complete set).
pub const ADVERTISED_FEATURES: &[&str] = &[
    "progressive_call_results",
    "call_timeout",
    "call_canceling",
    "caller_identification",
    "pattern_based_registration",
    "pattern_based_subscription",
    "shared_registration",
    "publisher_exclusion",
    "subscriber_blackwhite_listing",
    "publisher_identification",
];

/// Authentication methods a client may offer in HELLO.authmethods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthenticationMethod {
    Anonymous,
    Ticket,
    WampCra,
    CryptoSign,
}

impl AuthenticationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthenticationMethod::Anonymous => "anonymous",
            AuthenticationMethod::Ticket => "ticket",
            AuthenticationMethod::WampCra => "wampcra",
            AuthenticationMethod::CryptoSign => "cryptosign",
        }
    }
}

/// How a CANCEL should be handled by the router.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelMode {
    Skip,
    Kill,
    KillNoWait,
}

impl Default for CancelMode {
    fn default() -> Self {
        CancelMode::KillNoWait
    }
}

impl CancelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelMode::Skip => "skip",
            CancelMode::Kill => "kill",
            CancelMode::KillNoWait => "killnowait",
        }
    }
}

pub const DEFAULT_AGENT_STR: &str = "wampcore";

// Reserved `wamp.error.*` / `wamp.close.*` URIs.
pub const ERR_INVALID_URI: &str = "wamp.error.invalid_uri";
pub const ERR_NO_SUCH_PROCEDURE: &str = "wamp.error.no_such_procedure";
pub const ERR_PROCEDURE_ALREADY_EXISTS: &str = "wamp.error.procedure_already_exists";
pub const ERR_NO_SUCH_REGISTRATION: &str = "wamp.error.no_such_registration";
pub const ERR_NO_SUCH_SUBSCRIPTION: &str = "wamp.error.no_such_subscription";
pub const ERR_INVALID_ARGUMENT: &str = "wamp.error.invalid_argument";
pub const ERR_NOT_AUTHORIZED: &str = "wamp.error.not_authorized";
pub const ERR_AUTHORIZATION_FAILED: &str = "wamp.error.authorization_failed";
pub const ERR_NO_SUCH_REALM: &str = "wamp.error.no_such_realm";
pub const ERR_NO_SUCH_ROLE: &str = "wamp.error.no_such_role";
pub const ERR_CANCELED: &str = "wamp.error.canceled";
pub const ERR_OPTION_NOT_ALLOWED: &str = "wamp.error.option_not_allowed";
pub const ERR_NO_ELIGIBLE_CALLEE: &str = "wamp.error.no_eligible_callee";
pub const ERR_RUNTIME_ERROR: &str = "wamp.error.runtime_error";
pub const ERR_PROTOCOL_VIOLATION: &str = "wamp.error.protocol_violation";
pub const ERR_OPTION_DISALLOWED_DISCLOSE_ME: &str = "wamp.error.option_disallowed.disclose_me";
pub const ERR_NETWORK_FAILURE: &str = "wamp.error.network_failure";

pub const CLOSE_NORMAL: &str = "wamp.close.normal";
pub const CLOSE_GOODBYE_AND_OUT: &str = "wamp.close.goodbye_and_out";
pub const CLOSE_SYSTEM_SHUTDOWN: &str = "wamp.close.system_shutdown";
pub const CLOSE_CLOSE_REALM: &str = "wamp.close.close_realm";

/// Sequential request-id generator: u64, wraps back to 1 (never 0) on
/// overflow of 2^53.
pub struct IdGenerator {
    next: u64,
}

const MAX_ID: u64 = 1 << 53;

impl Default for IdGenerator {
    fn default() -> Self {
        IdGenerator { next: 1 }
    }
}

impl IdGenerator {
    pub fn new() -> IdGenerator {
        IdGenerator::default()
    }

    pub fn next_id(&mut self) -> WampId {
        let id = self.next;
        self.next = if self.next >= MAX_ID { 1 } else { self.next + 1 };
        id
    }
}

/// Converts a serde-serializable value into positional WAMP arguments
/// (a one-element list containing the serialized value as an `Arg`).
pub fn try_into_args<T: serde::Serialize>(value: &T) -> Result<WampArgs, crate::error::WampError> {
    Ok(vec![try_into_any_value(value)?])
}

/// Converts a single value into an `Arg` via its `serde::Serialize` impl.
pub fn try_into_any_value<T: serde::Serialize>(value: &T) -> Result<Arg, crate::error::WampError> {
    let json = serde_json::to_value(value)
        .map_err(|e| crate::error::WampError::UnknownError(e.to_string()))?;
    serde_json::from_value(json).map_err(|e| crate::error::WampError::UnknownError(e.to_string()))
}

/// Converts positional WAMP arguments back into a typed value (deserializes
/// the first element).
pub fn try_from_args<T: serde::de::DeserializeOwned>(args: &Option<WampArgs>) -> Result<T, crate::error::WampError> {
    let first = args
        .as_ref()
        .and_then(|a| a.first())
        .ok_or_else(|| crate::error::WampError::UnknownError("missing positional argument".into()))?;
    try_from_any_value(first)
}

pub fn try_from_any_value<T: serde::de::DeserializeOwned>(value: &Arg) -> Result<T, crate::error::WampError> {
    let json = serde_json::to_value(value)
        .map_err(|e| crate::error::WampError::UnknownError(e.to_string()))?;
    serde_json::from_value(json).map_err(|e| crate::error::WampError::UnknownError(e.to_string()))
}

/// Converts a serde-serializable value into a single-key-per-field WAMP
/// keyword argument dict.
pub fn try_into_kwargs<T: serde::Serialize>(value: &T) -> Result<WampKwArgs, crate::error::WampError> {
    match try_into_any_value(value)? {
        Arg::Dict(d) => Ok(d),
        other => {
            let mut d = WampDict::new();
            d.insert("value".to_owned(), other);
            Ok(d)
        }
    }
}

pub fn try_from_kwargs<T: serde::de::DeserializeOwned>(kwargs: &Option<WampKwArgs>) -> Result<T, crate::error::WampError> {
    let dict = kwargs
        .clone()
        .ok_or_else(|| crate::error::WampError::UnknownError("missing keyword arguments".into()))?;
    let json = serde_json::to_value(Arg::Dict(dict))
        .map_err(|e| crate::error::WampError::UnknownError(e.to_string()))?;
    serde_json::from_value(json).map_err(|e| crate::error::WampError::UnknownError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_uris() {
        assert!(is_valid_strict_uri("io.giesela.add"));
        assert!(!is_valid_strict_uri("wamp.session.count"));
        assert!(!is_valid_strict_uri("io..add"));
        assert!(!is_valid_strict_uri("Io.Giesela"));
    }

    #[test]
    fn prefix_match_matches_spec_definition() {
        assert!(Uri::prefix_match("io.giesela", "io.giesela"));
        assert!(Uri::prefix_match("io.giesela", "io.giesela.add"));
        assert!(!Uri::prefix_match("io.giesela", "io.gieselax"));
    }

    #[test]
    fn wildcard_match_matches_spec_definition() {
        assert!(Uri::wildcard_match("io..add", "io.giesela.add"));
        assert!(!Uri::wildcard_match("io..add", "io.giesela.add.extra"));
        assert!(!Uri::wildcard_match("io.giesela.add", "io.other.add"));
    }

    #[test]
    fn id_generator_wraps_to_one_never_zero() {
        let mut g = IdGenerator::default();
        g.next = MAX_ID;
        assert_eq!(g.next_id(), MAX_ID);
        assert_eq!(g.next_id(), 1);
    }

    #[test]
    fn id_generator_is_sequential() {
        let mut g = IdGenerator::new();
        assert_eq!(g.next_id(), 1);
        assert_eq!(g.next_id(), 2);
        assert_eq!(g.next_id(), 3);
    }
}
