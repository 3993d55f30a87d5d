use quick_error::*;

use crate::message::Msg;

pub mod cbor;
pub mod json;
pub mod msgpack;

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Message serialization algorithms. `Cbor` is a non-standard extension
/// carried over from the reference crate; it is not advertised over
/// WebSocket subprotocol negotiation, only over raw-socket.
pub enum SerializerType {
    Invalid = 0,
    Json = 1,
    MsgPack = 2,
    Cbor = 3,
}

impl SerializerType {
    /// Returns the WAMP string representation of the serializer
    pub fn to_str(&self) -> &'static str {
        match self {
            &SerializerType::Json => "wamp.2.json",
            &SerializerType::MsgPack => "wamp.2.msgpack",
            &SerializerType::Cbor => "wamp.2.cbor-batched",
            _ => "wamp.2.invalid",
        }
    }

    /// Converts the WAMP serializer string to its enum variant
    pub fn from_str<T: AsRef<str>>(in_str: T) -> Self {
        let s = in_str.as_ref();

        if s == SerializerType::Json.to_str() {
            SerializerType::Json
        } else if s == SerializerType::MsgPack.to_str() {
            SerializerType::MsgPack
        } else if s == SerializerType::Cbor.to_str() {
            SerializerType::Cbor
        } else {
            SerializerType::Invalid
        }
    }

    /// Raw-socket handshake protocol code for this serializer.
    pub fn raw_socket_code(&self) -> u8 {
        match self {
            SerializerType::Json => 1,
            SerializerType::MsgPack => 2,
            SerializerType::Cbor => 3,
            SerializerType::Invalid => 0,
        }
    }

    pub fn from_raw_socket_code(code: u8) -> Self {
        match code {
            1 => SerializerType::Json,
            2 => SerializerType::MsgPack,
            3 => SerializerType::Cbor,
            _ => SerializerType::Invalid,
        }
    }

    pub fn new_impl(&self) -> Option<Box<dyn SerializerImpl + Send + Sync>> {
        match self {
            SerializerType::Json => Some(Box::new(json::JsonSerializer {})),
            SerializerType::MsgPack => Some(Box::new(msgpack::MsgPackSerializer {})),
            SerializerType::Cbor => Some(Box::new(cbor::CborSerializer {})),
            SerializerType::Invalid => None,
        }
    }
}

quick_error! {
    #[derive(Debug)]
    pub enum SerializerError {
        Serialization(e: String) {
            display("failed to serialize message: {}", e)
        }
        Deserialization(e: String) {
            display("failed to deserialize message: {}", e)
        }
    }
}

pub trait SerializerImpl: Send + Sync {
    fn pack(&self, value: &Msg) -> Result<Vec<u8>, SerializerError>;
    fn unpack<'a>(&self, v: &'a [u8]) -> Result<Msg, SerializerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializer_type_round_trips_through_str() {
        assert_eq!(SerializerType::from_str(SerializerType::Json.to_str()) as u8, SerializerType::Json as u8);
        assert_eq!(SerializerType::from_str(SerializerType::MsgPack.to_str()) as u8, SerializerType::MsgPack as u8);
    }

    #[test]
    fn raw_socket_codes_round_trip() {
        for t in [SerializerType::Json, SerializerType::MsgPack, SerializerType::Cbor] {
            assert_eq!(SerializerType::from_raw_socket_code(t.raw_socket_code()) as u8, t as u8);
        }
    }
}
