use async_trait::async_trait;
use quick_error::*;

pub mod tcp;
pub use tcp::*;

pub mod websocket;
pub use crate::transport::websocket as ws;
pub use ws::*;

#[async_trait]
pub trait Transport: Send {
    /// Sends a whole wamp message over the transport. Serializes exactly
    /// one message and flushes.
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;
    /// Blocks until one complete message is available.
    async fn recv(&mut self) -> Result<Vec<u8>, TransportError>;
    /// Closes the transport connection with the host. Idempotent.
    async fn close(&mut self);
}

quick_error! {
    #[derive(Debug)]
    pub enum TransportError {
        MaximumServerConn {
            display("server hit the maximum connection count")
        }
        UnexpectedResponse {
            display("server responded with unexpected data")
        }
        SerializerNotSupported(e: String) {
            display("the current serializer is not supported by the server (requested: {})", e)
        }
        InvalidMaximumMsgSize(e: u32) {
            display("the server did not accept the maximum payload size (requested: {})", e)
        }
        IllegalHandshakeErrorCode {
            display("handshake rejection carried an illegal error code")
        }
        ReservedBitsUsed {
            display("handshake rejection: use of reserved bits")
        }
        ConnectionFailed {
            display("failed to negotiate connection with the server")
        }
        SendFailed {
            display("failed to send message to peer")
        }
        ReceiveFailed {
            display("failed to receive message from peer")
        }
        RecvLimitExceeded(limit: u32) {
            display("peer sent a frame exceeding the negotiated receive limit of {} bytes", limit)
        }
        Closed {
            display("the transport has already been closed")
        }
    }
}

/// Raw-socket handshake: `2^(9+exp)` bytes, `exp` clamped to `[0, 15]`.
pub fn byte_limit_to_size(exp: u8) -> u32 {
    1u32 << (9 + exp as u32)
}

/// Minimum exponent such that `2^(9+exp) >= requested_size`. `0` is the
/// sentinel for "use the default" (2^9 = 512 bytes) per the resolved open
/// question on raw-socket recv-limit negotiation.
pub fn size_to_byte_limit(requested_size: u32) -> u8 {
    if requested_size == 0 {
        return 0;
    }
    for exp in 0..=15u8 {
        if byte_limit_to_size(exp) >= requested_size {
            return exp;
        }
    }
    15
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sentinel_is_512_bytes() {
        assert_eq!(byte_limit_to_size(0), 512);
    }

    #[test]
    fn size_to_byte_limit_picks_minimum_exponent() {
        assert_eq!(size_to_byte_limit(0), 0);
        assert_eq!(size_to_byte_limit(512), 0);
        assert_eq!(size_to_byte_limit(513), 1);
        assert_eq!(byte_limit_to_size(size_to_byte_limit(100_000)) >= 100_000, true);
    }
}
