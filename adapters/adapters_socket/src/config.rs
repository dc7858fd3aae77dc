//! Socket Configuration
//!
//! Settings shared by [`ServerSocket`](crate::ServerSocket) and
//! [`ClientSocket`](crate::ClientSocket) construction.

use crate::socket::ProtocolType;

/// Buffer-size hint used when none is given
pub const DEFAULT_BUFFER_SIZE_HINT: u16 = 4096;

/// Pending-connection queue length for listening stream sockets
pub const DEFAULT_BACKLOG: i32 = 128;

/// Socket construction settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketConfig {
    /// Stream or datagram transport
    pub protocol: ProtocolType,
    /// Advisory receive-buffer size; stored and reported, never enforced
    pub buffer_size_hint: u16,
    /// Listen backlog; ignored by client and datagram sockets
    pub backlog: i32,
}

impl SocketConfig {
    /// Config for `protocol` with the given buffer-size hint
    pub fn new(protocol: ProtocolType, buffer_size_hint: u16) -> Self {
        Self {
            protocol,
            buffer_size_hint,
            ..Self::default()
        }
    }

    /// Replace the transport protocol
    pub fn with_protocol(mut self, protocol: ProtocolType) -> Self {
        self.protocol = protocol;
        self
    }

    /// Replace the advisory buffer-size hint
    pub fn with_buffer_size_hint(mut self, buffer_size_hint: u16) -> Self {
        self.buffer_size_hint = buffer_size_hint;
        self
    }

    /// Replace the listen backlog
    pub fn with_backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolType::Stream,
            buffer_size_hint: DEFAULT_BUFFER_SIZE_HINT,
            backlog: DEFAULT_BACKLOG,
        }
    }
}
