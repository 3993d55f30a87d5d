//! Wire message codec: the tagged union over WAMP v2 message type codes and
//! the value lattice messages are built from.

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::WampError;

pub type WampUri = String;
pub type WampId = u64;
pub type WampInteger = i64;
pub type WampString = String;
pub type WampBool = bool;

/// A single value in the WAMP value lattice: integer, string, bool, ordered
/// sequence, keyed mapping. Serializes untagged so the wire representation is
/// the bare JSON/MsgPack/CBOR scalar, array or object rather than a
/// Rust-enum-tagged wrapper.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Arg {
    Integer(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    String(String),
    List(WampList),
    Dict(WampDict),
}

pub type WampList = Vec<Arg>;
pub type WampDict = HashMap<String, Arg>;
pub type WampArgs = WampList;
pub type WampKwArgs = WampDict;

/// Reserved marker prepended to a base64 blob when a text-only serializer
/// must carry binary data.
pub const BINARY_MARKER: char = '\u{0}';

impl Arg {
    pub fn from_bytes(bytes: &[u8]) -> Arg {
        let mut s = String::with_capacity(bytes.len() + 1);
        s.push(BINARY_MARKER);
        s.push_str(&base64_encode(bytes));
        Arg::String(s)
    }

    pub fn as_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Arg::String(s) => {
                let mut chars = s.chars();
                if chars.next() == Some(BINARY_MARKER) {
                    base64_decode(chars.as_str())
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Arg::UInt(v) => Some(*v),
            Arg::Integer(v) if *v >= 0 => Some(*v as u64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Arg::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&WampDict> {
        match self {
            Arg::Dict(d) => Some(d),
            _ => None,
        }
    }
}

// Tiny dependency-free base64 codec used only for the binary blob tunnel, so
// the transport-agnostic message layer doesn't need to pull in a base64
// crate for this one narrow path.
fn base64_encode(bytes: &[u8]) -> String {
    const TABLE: &[u8; 64] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = String::with_capacity((bytes.len() + 2) / 3 * 4);
    for chunk in bytes.chunks(3) {
        let b0 = chunk[0];
        let b1 = *chunk.get(1).unwrap_or(&0);
        let b2 = *chunk.get(2).unwrap_or(&0);
        out.push(TABLE[(b0 >> 2) as usize] as char);
        out.push(TABLE[(((b0 & 0x03) << 4) | (b1 >> 4)) as usize] as char);
        out.push(if chunk.len() > 1 {
            TABLE[(((b1 & 0x0f) << 2) | (b2 >> 6)) as usize] as char
        } else {
            '='
        });
        out.push(if chunk.len() > 2 {
            TABLE[(b2 & 0x3f) as usize] as char
        } else {
            '='
        });
    }
    out
}

fn base64_decode(s: &str) -> Option<Vec<u8>> {
    fn val(c: u8) -> Option<u8> {
        match c {
            b'A'..=b'Z' => Some(c - b'A'),
            b'a'..=b'z' => Some(c - b'a' + 26),
            b'0'..=b'9' => Some(c - b'0' + 52),
            b'+' => Some(62),
            b'/' => Some(63),
            _ => None,
        }
    }
    let s = s.trim_end_matches('=');
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() * 3 / 4);
    for chunk in bytes.chunks(4) {
        let vals: Vec<u8> = chunk.iter().map(|b| val(*b)).collect::<Option<_>>()?;
        out.push((vals[0] << 2) | (vals.get(1).copied().unwrap_or(0) >> 4));
        if vals.len() > 2 {
            out.push((vals[1] << 4) | (vals[2] >> 2));
        }
        if vals.len() > 3 {
            out.push((vals[2] << 6) | vals[3]);
        }
    }
    Some(out)
}

macro_rules! wamp_value_from {
    ($variant:ident, $($t:ty),+) => {
        $(impl From<$t> for Arg {
            fn from(v: $t) -> Arg { Arg::$variant(v.into()) }
        })+
    };
}
wamp_value_from!(Integer, i64, i32, i16, i8);
wamp_value_from!(UInt, u64, u32, u16, u8);
wamp_value_from!(Float, f64, f32);
wamp_value_from!(Bool, bool);
wamp_value_from!(String, String);

impl From<&str> for Arg {
    fn from(v: &str) -> Arg {
        Arg::String(v.to_owned())
    }
}
impl<T: Into<Arg>> From<Vec<T>> for Arg {
    fn from(v: Vec<T>) -> Arg {
        Arg::List(v.into_iter().map(Into::into).collect())
    }
}
impl From<WampDict> for Arg {
    fn from(v: WampDict) -> Arg {
        Arg::Dict(v)
    }
}

/// Message type codes, WAMP v2 basic + advanced profile.
pub const HELLO: u64 = 1;
pub const WELCOME: u64 = 2;
pub const ABORT: u64 = 3;
pub const CHALLENGE: u64 = 4;
pub const AUTHENTICATE: u64 = 5;
pub const GOODBYE: u64 = 6;
pub const ERROR: u64 = 8;
pub const PUBLISH: u64 = 16;
pub const PUBLISHED: u64 = 17;
pub const SUBSCRIBE: u64 = 32;
pub const SUBSCRIBED: u64 = 33;
pub const UNSUBSCRIBE: u64 = 34;
pub const UNSUBSCRIBED: u64 = 35;
pub const EVENT: u64 = 36;
pub const CALL: u64 = 48;
pub const CANCEL: u64 = 49;
pub const RESULT: u64 = 50;
pub const REGISTER: u64 = 64;
pub const REGISTERED: u64 = 65;
pub const UNREGISTER: u64 = 66;
pub const UNREGISTERED: u64 = 67;
pub const INVOCATION: u64 = 68;
pub const INTERRUPT: u64 = 69;
pub const YIELD: u64 = 70;

/// A WAMP protocol message. Every variant carries the fixed-arity payload
/// defined by the WAMP spec. `encode`/`decode` implement the tagged-union
/// sequence contract; `Serialize`/`Deserialize` delegate to them so any
/// `SerializerImpl` gets the wire format for free.
#[derive(Clone, Debug, PartialEq)]
pub enum Msg {
    Hello {
        realm: WampUri,
        details: WampDict,
    },
    Welcome {
        session: WampId,
        details: WampDict,
    },
    Abort {
        details: WampDict,
        reason: WampUri,
    },
    Challenge {
        auth_method: WampString,
        extra: WampDict,
    },
    Authenticate {
        signature: WampString,
        extra: WampDict,
    },
    Goodbye {
        details: WampDict,
        reason: WampUri,
    },
    Error {
        request_type: WampInteger,
        request: WampId,
        details: WampDict,
        error: WampUri,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    },
    Publish {
        request: WampId,
        options: WampDict,
        topic: WampUri,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    },
    Published {
        request: WampId,
        publication: WampId,
    },
    Subscribe {
        request: WampId,
        options: WampDict,
        topic: WampUri,
    },
    Subscribed {
        request: WampId,
        subscription: WampId,
    },
    Unsubscribe {
        request: WampId,
        subscription: WampId,
    },
    Unsubscribed {
        request: WampId,
    },
    Event {
        subscription: WampId,
        publication: WampId,
        details: WampDict,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    },
    Call {
        request: WampId,
        options: WampDict,
        procedure: WampUri,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    },
    Cancel {
        request: WampId,
        options: WampDict,
    },
    Result {
        request: WampId,
        details: WampDict,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    },
    Register {
        request: WampId,
        options: WampDict,
        procedure: WampUri,
    },
    Registered {
        request: WampId,
        registration: WampId,
    },
    Unregister {
        request: WampId,
        registration: WampId,
    },
    Unregistered {
        request: WampId,
    },
    Invocation {
        request: WampId,
        registration: WampId,
        details: WampDict,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    },
    Interrupt {
        request: WampId,
        options: WampDict,
    },
    Yield {
        request: WampId,
        options: WampDict,
        arguments: Option<WampArgs>,
        arguments_kw: Option<WampKwArgs>,
    },
}

impl Msg {
    pub fn code(&self) -> u64 {
        match self {
            Msg::Hello { .. } => HELLO,
            Msg::Welcome { .. } => WELCOME,
            Msg::Abort { .. } => ABORT,
            Msg::Challenge { .. } => CHALLENGE,
            Msg::Authenticate { .. } => AUTHENTICATE,
            Msg::Goodbye { .. } => GOODBYE,
            Msg::Error { .. } => ERROR,
            Msg::Publish { .. } => PUBLISH,
            Msg::Published { .. } => PUBLISHED,
            Msg::Subscribe { .. } => SUBSCRIBE,
            Msg::Subscribed { .. } => SUBSCRIBED,
            Msg::Unsubscribe { .. } => UNSUBSCRIBE,
            Msg::Unsubscribed { .. } => UNSUBSCRIBED,
            Msg::Event { .. } => EVENT,
            Msg::Call { .. } => CALL,
            Msg::Cancel { .. } => CANCEL,
            Msg::Result { .. } => RESULT,
            Msg::Register { .. } => REGISTER,
            Msg::Registered { .. } => REGISTERED,
            Msg::Unregister { .. } => UNREGISTER,
            Msg::Unregistered { .. } => UNREGISTERED,
            Msg::Invocation { .. } => INVOCATION,
            Msg::Interrupt { .. } => INTERRUPT,
            Msg::Yield { .. } => YIELD,
        }
    }

    /// The request_id of this message, if it carries one (used by the
    /// request multiplexer to route replies).
    pub fn request_id(&self) -> Option<WampId> {
        match self {
            Msg::Hello { .. }
            | Msg::Welcome { .. }
            | Msg::Abort { .. }
            | Msg::Challenge { .. }
            | Msg::Authenticate { .. }
            | Msg::Goodbye { .. }
            | Msg::Event { .. } => None,
            Msg::Error { request, .. }
            | Msg::Publish { request, .. }
            | Msg::Published { request, .. }
            | Msg::Subscribe { request, .. }
            | Msg::Subscribed { request, .. }
            | Msg::Unsubscribe { request, .. }
            | Msg::Unsubscribed { request }
            | Msg::Call { request, .. }
            | Msg::Cancel { request, .. }
            | Msg::Result { request, .. }
            | Msg::Register { request, .. }
            | Msg::Registered { request, .. }
            | Msg::Unregister { request, .. }
            | Msg::Unregistered { request }
            | Msg::Invocation { request, .. }
            | Msg::Interrupt { request, .. }
            | Msg::Yield { request, .. } => Some(*request),
        }
    }

    /// Encodes this message into its homogeneous sequence representation:
    /// `[code, field1, field2, ...]` with trailing optional fields omitted
    /// when absent.
    pub fn encode(&self) -> WampList {
        fn tail(args: &Option<WampArgs>, kwargs: &Option<WampKwArgs>) -> Vec<Arg> {
            match (args, kwargs) {
                (None, None) => vec![],
                (Some(a), None) => vec![Arg::List(a.clone())],
                (None, Some(k)) => vec![Arg::List(vec![]), Arg::Dict(k.clone())],
                (Some(a), Some(k)) => vec![Arg::List(a.clone()), Arg::Dict(k.clone())],
            }
        }

        let code = self.code();
        let mut out = vec![Arg::UInt(code)];
        match self {
            Msg::Hello { realm, details } => {
                out.push(Arg::String(realm.clone()));
                out.push(Arg::Dict(details.clone()));
            }
            Msg::Welcome { session, details } => {
                out.push(Arg::UInt(*session));
                out.push(Arg::Dict(details.clone()));
            }
            Msg::Abort { details, reason } | Msg::Goodbye { details, reason } => {
                out.push(Arg::Dict(details.clone()));
                out.push(Arg::String(reason.clone()));
            }
            Msg::Challenge { auth_method, extra } => {
                out.push(Arg::String(auth_method.clone()));
                out.push(Arg::Dict(extra.clone()));
            }
            Msg::Authenticate { signature, extra } => {
                out.push(Arg::String(signature.clone()));
                out.push(Arg::Dict(extra.clone()));
            }
            Msg::Error {
                request_type,
                request,
                details,
                error,
                arguments,
                arguments_kw,
            } => {
                out.push(Arg::Integer(*request_type));
                out.push(Arg::UInt(*request));
                out.push(Arg::Dict(details.clone()));
                out.push(Arg::String(error.clone()));
                out.extend(tail(arguments, arguments_kw));
            }
            Msg::Publish {
                request,
                options,
                topic,
                arguments,
                arguments_kw,
            } => {
                out.push(Arg::UInt(*request));
                out.push(Arg::Dict(options.clone()));
                out.push(Arg::String(topic.clone()));
                out.extend(tail(arguments, arguments_kw));
            }
            Msg::Published {
                request,
                publication,
            } => {
                out.push(Arg::UInt(*request));
                out.push(Arg::UInt(*publication));
            }
            Msg::Subscribe {
                request,
                options,
                topic,
            } => {
                out.push(Arg::UInt(*request));
                out.push(Arg::Dict(options.clone()));
                out.push(Arg::String(topic.clone()));
            }
            Msg::Subscribed {
                request,
                subscription,
            } => {
                out.push(Arg::UInt(*request));
                out.push(Arg::UInt(*subscription));
            }
            Msg::Unsubscribe {
                request,
                subscription,
            } => {
                out.push(Arg::UInt(*request));
                out.push(Arg::UInt(*subscription));
            }
            Msg::Unsubscribed { request } => {
                out.push(Arg::UInt(*request));
            }
            Msg::Event {
                subscription,
                publication,
                details,
                arguments,
                arguments_kw,
            } => {
                out.push(Arg::UInt(*subscription));
                out.push(Arg::UInt(*publication));
                out.push(Arg::Dict(details.clone()));
                out.extend(tail(arguments, arguments_kw));
            }
            Msg::Call {
                request,
                options,
                procedure,
                arguments,
                arguments_kw,
            } => {
                out.push(Arg::UInt(*request));
                out.push(Arg::Dict(options.clone()));
                out.push(Arg::String(procedure.clone()));
                out.extend(tail(arguments, arguments_kw));
            }
            Msg::Cancel { request, options } => {
                out.push(Arg::UInt(*request));
                out.push(Arg::Dict(options.clone()));
            }
            Msg::Result {
                request,
                details,
                arguments,
                arguments_kw,
            } => {
                out.push(Arg::UInt(*request));
                out.push(Arg::Dict(details.clone()));
                out.extend(tail(arguments, arguments_kw));
            }
            Msg::Register {
                request,
                options,
                procedure,
            } => {
                out.push(Arg::UInt(*request));
                out.push(Arg::Dict(options.clone()));
                out.push(Arg::String(procedure.clone()));
            }
            Msg::Registered {
                request,
                registration,
            } => {
                out.push(Arg::UInt(*request));
                out.push(Arg::UInt(*registration));
            }
            Msg::Unregister {
                request,
                registration,
            } => {
                out.push(Arg::UInt(*request));
                out.push(Arg::UInt(*registration));
            }
            Msg::Unregistered { request } => {
                out.push(Arg::UInt(*request));
            }
            Msg::Invocation {
                request,
                registration,
                details,
                arguments,
                arguments_kw,
            } => {
                out.push(Arg::UInt(*request));
                out.push(Arg::UInt(*registration));
                out.push(Arg::Dict(details.clone()));
                out.extend(tail(arguments, arguments_kw));
            }
            Msg::Interrupt { request, options } => {
                out.push(Arg::UInt(*request));
                out.push(Arg::Dict(options.clone()));
            }
            Msg::Yield {
                request,
                options,
                arguments,
                arguments_kw,
            } => {
                out.push(Arg::UInt(*request));
                out.push(Arg::Dict(options.clone()));
                out.extend(tail(arguments, arguments_kw));
            }
        }
        out
    }

    /// Decodes a sequence produced by [`encode`](Self::encode). Rejects
    /// unknown type codes and field counts that don't match the arity
    /// required for the code.
    pub fn decode(mut seq: WampList) -> Result<Msg, WampError> {
        if seq.is_empty() {
            return Err(WampError::InvalidMessage("empty message sequence".into()));
        }
        let code = seq
            .remove(0)
            .as_u64()
            .ok_or_else(|| WampError::InvalidMessage("leading element is not a type code".into()))?;

        let mut it = seq.into_iter();
        macro_rules! next {
            ($what:expr) => {
                it.next()
                    .ok_or_else(|| WampError::InvalidMessage(format!("missing field: {}", $what)))?
            };
        }
        fn as_uri(a: Arg) -> Result<WampUri, WampError> {
            match a {
                Arg::String(s) => Ok(s),
                _ => Err(WampError::InvalidMessage("expected a URI string".into())),
            }
        }
        fn as_id(a: Arg) -> Result<WampId, WampError> {
            a.as_u64()
                .ok_or_else(|| WampError::InvalidMessage("expected an id".into()))
        }
        fn as_dict(a: Arg) -> Result<WampDict, WampError> {
            match a {
                Arg::Dict(d) => Ok(d),
                _ => Err(WampError::InvalidMessage("expected a dict".into())),
            }
        }
        fn tail(mut it: impl Iterator<Item = Arg>) -> Result<(Option<WampArgs>, Option<WampKwArgs>), WampError> {
            let args = match it.next() {
                None => return Ok((None, None)),
                Some(Arg::List(l)) => l,
                Some(_) => return Err(WampError::InvalidMessage("expected an arguments list".into())),
            };
            let kwargs = match it.next() {
                None => None,
                Some(Arg::Dict(d)) => Some(d),
                Some(_) => return Err(WampError::InvalidMessage("expected a kwarguments dict".into())),
            };
            Ok((Some(args), kwargs))
        }

        let msg = match code {
            HELLO => Msg::Hello {
                realm: as_uri(next!("realm"))?,
                details: as_dict(next!("details"))?,
            },
            WELCOME => Msg::Welcome {
                session: as_id(next!("session"))?,
                details: as_dict(next!("details"))?,
            },
            ABORT => Msg::Abort {
                details: as_dict(next!("details"))?,
                reason: as_uri(next!("reason"))?,
            },
            CHALLENGE => Msg::Challenge {
                auth_method: as_uri(next!("auth_method"))?,
                extra: as_dict(next!("extra"))?,
            },
            AUTHENTICATE => Msg::Authenticate {
                signature: as_uri(next!("signature"))?,
                extra: as_dict(next!("extra"))?,
            },
            GOODBYE => Msg::Goodbye {
                details: as_dict(next!("details"))?,
                reason: as_uri(next!("reason"))?,
            },
            ERROR => {
                let request_type = next!("request_type")
                    .as_u64()
                    .ok_or_else(|| WampError::InvalidMessage("expected request_type".into()))?
                    as WampInteger;
                let request = as_id(next!("request"))?;
                let details = as_dict(next!("details"))?;
                let error = as_uri(next!("error"))?;
                let (arguments, arguments_kw) = tail(it)?;
                Msg::Error {
                    request_type,
                    request,
                    details,
                    error,
                    arguments,
                    arguments_kw,
                }
            }
            PUBLISH => {
                let request = as_id(next!("request"))?;
                let options = as_dict(next!("options"))?;
                let topic = as_uri(next!("topic"))?;
                let (arguments, arguments_kw) = tail(it)?;
                Msg::Publish {
                    request,
                    options,
                    topic,
                    arguments,
                    arguments_kw,
                }
            }
            PUBLISHED => Msg::Published {
                request: as_id(next!("request"))?,
                publication: as_id(next!("publication"))?,
            },
            SUBSCRIBE => Msg::Subscribe {
                request: as_id(next!("request"))?,
                options: as_dict(next!("options"))?,
                topic: as_uri(next!("topic"))?,
            },
            SUBSCRIBED => Msg::Subscribed {
                request: as_id(next!("request"))?,
                subscription: as_id(next!("subscription"))?,
            },
            UNSUBSCRIBE => Msg::Unsubscribe {
                request: as_id(next!("request"))?,
                subscription: as_id(next!("subscription"))?,
            },
            UNSUBSCRIBED => Msg::Unsubscribed {
                request: as_id(next!("request"))?,
            },
            EVENT => {
                let subscription = as_id(next!("subscription"))?;
                let publication = as_id(next!("publication"))?;
                let details = as_dict(next!("details"))?;
                let (arguments, arguments_kw) = tail(it)?;
                Msg::Event {
                    subscription,
                    publication,
                    details,
                    arguments,
                    arguments_kw,
                }
            }
            CALL => {
                let request = as_id(next!("request"))?;
                let options = as_dict(next!("options"))?;
                let procedure = as_uri(next!("procedure"))?;
                let (arguments, arguments_kw) = tail(it)?;
                Msg::Call {
                    request,
                    options,
                    procedure,
                    arguments,
                    arguments_kw,
                }
            }
            CANCEL => Msg::Cancel {
                request: as_id(next!("request"))?,
                options: as_dict(next!("options"))?,
            },
            RESULT => {
                let request = as_id(next!("request"))?;
                let details = as_dict(next!("details"))?;
                let (arguments, arguments_kw) = tail(it)?;
                Msg::Result {
                    request,
                    details,
                    arguments,
                    arguments_kw,
                }
            }
            REGISTER => Msg::Register {
                request: as_id(next!("request"))?,
                options: as_dict(next!("options"))?,
                procedure: as_uri(next!("procedure"))?,
            },
            REGISTERED => Msg::Registered {
                request: as_id(next!("request"))?,
                registration: as_id(next!("registration"))?,
            },
            UNREGISTER => Msg::Unregister {
                request: as_id(next!("request"))?,
                registration: as_id(next!("registration"))?,
            },
            UNREGISTERED => Msg::Unregistered {
                request: as_id(next!("request"))?,
            },
            INVOCATION => {
                let request = as_id(next!("request"))?;
                let registration = as_id(next!("registration"))?;
                let details = as_dict(next!("details"))?;
                let (arguments, arguments_kw) = tail(it)?;
                Msg::Invocation {
                    request,
                    registration,
                    details,
                    arguments,
                    arguments_kw,
                }
            }
            INTERRUPT => Msg::Interrupt {
                request: as_id(next!("request"))?,
                options: as_dict(next!("options"))?,
            },
            YIELD => {
                let request = as_id(next!("request"))?;
                let options = as_dict(next!("options"))?;
                let (arguments, arguments_kw) = tail(it)?;
                Msg::Yield {
                    request,
                    options,
                    arguments,
                    arguments_kw,
                }
            }
            other => return Err(WampError::InvalidMessage(format!("unknown message type code: {}", other))),
        };

        Ok(msg)
    }
}

impl Serialize for Msg {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let seq = self.encode();
        let mut s = serializer.serialize_seq(Some(seq.len()))?;
        for item in &seq {
            s.serialize_element(item)?;
        }
        s.end()
    }
}

impl<'de> Deserialize<'de> for Msg {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Msg, D::Error> {
        struct MsgVisitor;
        impl<'de> Visitor<'de> for MsgVisitor {
            type Value = Msg;
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a WAMP message sequence [code, ...fields]")
            }
            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Msg, A::Error> {
                let mut list = WampList::new();
                while let Some(el) = seq.next_element::<Arg>()? {
                    list.push(el);
                }
                Msg::decode(list).map_err(de::Error::custom)
            }
        }
        deserializer.deserialize_seq(MsgVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict(pairs: &[(&str, Arg)]) -> WampDict {
        pairs.iter().cloned().map(|(k, v)| (k.to_owned(), v)).collect()
    }

    #[test]
    fn round_trip_hello() {
        let m = Msg::Hello {
            realm: "io.giesela.test".into(),
            details: dict(&[("roles", Arg::Dict(WampDict::new()))]),
        };
        let encoded = m.encode();
        assert_eq!(encoded[0], Arg::UInt(HELLO));
        let decoded = Msg::decode(encoded).unwrap();
        assert_eq!(decoded, m);
    }

    #[test]
    fn round_trip_call_with_args_and_kwargs() {
        let m = Msg::Call {
            request: 1,
            options: WampDict::new(),
            procedure: "io.giesela.add".into(),
            arguments: Some(vec![Arg::Integer(1), Arg::Integer(3)]),
            arguments_kw: Some(dict(&[("iterations", Arg::Integer(3))])),
        };
        let decoded = Msg::decode(m.encode()).unwrap();
        assert_eq!(decoded, m);
    }

    #[test]
    fn round_trip_omits_absent_trailing_fields() {
        let m = Msg::Result {
            request: 1,
            details: WampDict::new(),
            arguments: None,
            arguments_kw: None,
        };
        let encoded = m.encode();
        // code + request + details, nothing else.
        assert_eq!(encoded.len(), 3);
        assert_eq!(Msg::decode(encoded).unwrap(), m);
    }

    #[test]
    fn decode_rejects_unknown_code() {
        let err = Msg::decode(vec![Arg::UInt(999)]).unwrap_err();
        assert!(matches!(err, WampError::InvalidMessage(_)));
    }

    #[test]
    fn decode_rejects_empty_sequence() {
        assert!(Msg::decode(vec![]).is_err());
    }

    #[test]
    fn binary_blob_tunnel_round_trips() {
        let payload = vec![0u8, 1, 2, 250, 255];
        let arg = Arg::from_bytes(&payload);
        assert_eq!(arg.as_bytes(), Some(payload));
    }

    #[test]
    fn json_wire_round_trip() {
        let m = Msg::Welcome {
            session: 42,
            details: WampDict::new(),
        };
        let bytes = serde_json::to_vec(&m).unwrap();
        assert_eq!(bytes, b"[2,42,{}]");
        let back: Msg = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, m);
    }
}
