//! Client Socket Module
//!
//! A socket connected to a remote peer, and its single I/O operation.

use std::net::SocketAddr;
#[cfg(unix)]
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd, RawFd};
#[cfg(windows)]
use std::os::windows::io::{AsRawSocket, AsSocket, BorrowedSocket, RawSocket};

use entities_socket::{SocketCounter, SocketHandle};
use socket2::{Domain, SockAddr};
use tracing::{debug, trace, warn};

use crate::config::SocketConfig;
use crate::error::{os_error_text, SocketError};
use crate::socket::{ProtocolType, Socket};
use crate::sys::{SocketSys, Sys};

/// Connected endpoint
///
/// Owns its handle exclusively. Datagram client sockets are "connected" in the
/// POSIX sense: the peer address is fixed and `write` sends to it.
#[derive(Debug)]
pub struct ClientSocket {
    socket: Socket,
    peer: SocketAddr,
}

impl ClientSocket {
    /// Resolve `address` and connect to `port` on it
    ///
    /// Every resolved address is tried in resolver order with a fresh handle;
    /// handles of failed attempts are closed before the next attempt.
    ///
    /// # Arguments
    ///
    /// * `address` - Host name or numeric IPv4/IPv6 address
    /// * `port` - Remote port
    /// * `protocol` - Stream or datagram
    /// * `buffer_size_hint` - Advisory receive-buffer size
    /// * `counter` - Live-socket counter this socket reports to
    ///
    /// # Returns
    ///
    /// * `Ok(ClientSocket)` - Connected socket
    /// * `Err(SocketError)` - `Resolve`, `Open` or `Connect` (the error of the
    ///   last address tried); nothing is left open
    pub fn new(
        address: &str,
        port: u16,
        protocol: ProtocolType,
        buffer_size_hint: u16,
        counter: &SocketCounter,
    ) -> Result<Self, SocketError> {
        Self::with_config(
            address,
            port,
            &SocketConfig::new(protocol, buffer_size_hint),
            counter,
        )
    }

    /// Connect using the protocol and buffer-size hint from `config`
    pub fn with_config(
        address: &str,
        port: u16,
        config: &SocketConfig,
        counter: &SocketCounter,
    ) -> Result<Self, SocketError> {
        let resolve_error = |reason: String| {
            warn!(address, port, %reason, "address resolution failed");
            SocketError::Resolve {
                address: address.to_string(),
                port,
                reason,
            }
        };
        let candidates = Sys::resolve_address(Some(address), port, config.protocol)
            .map_err(resolve_error)?
            .addresses();
        if candidates.is_empty() {
            return Err(resolve_error("no usable address".to_string()));
        }

        let mut last_error = None;
        for candidate in candidates {
            let socket = match Socket::open(
                Domain::for_address(candidate),
                config.protocol,
                config.buffer_size_hint,
                counter,
            ) {
                Ok(socket) => socket,
                Err(e) => {
                    last_error = Some(e);
                    continue;
                }
            };

            match socket.sock_ref().connect(&SockAddr::from(candidate)) {
                Ok(()) => {
                    debug!(
                        handle = socket.handle(),
                        peer = %candidate,
                        protocol = ?config.protocol,
                        "client socket connected"
                    );
                    return Ok(Self {
                        socket,
                        peer: candidate,
                    });
                }
                Err(e) => {
                    let reason = os_error_text(&e);
                    debug!(peer = %candidate, %reason, "connect attempt failed");
                    last_error = Some(SocketError::Connect {
                        address: address.to_string(),
                        port,
                        reason,
                    });
                }
            }
        }

        let err = last_error.unwrap_or_else(|| resolve_error("no usable address".to_string()));
        warn!(address, port, error = %err, "client socket construction failed");
        Err(err)
    }

    /// Send `data` to the peer with a single send call
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Bytes actually sent; may be fewer than `data.len()`,
    ///   in which case the caller sends the remainder
    /// * `Err(SocketError::Send)` - The platform's description of the failure;
    ///   the socket is still owned and may be retried or dropped
    pub fn write(&mut self, data: &[u8]) -> Result<usize, SocketError> {
        let socket = self.socket.sock_ref();
        match socket.send_with_flags(data, Sys::SEND_FLAGS) {
            Ok(written) => {
                trace!(
                    handle = self.socket.handle(),
                    requested = data.len(),
                    written,
                    "write"
                );
                Ok(written)
            }
            Err(e) => {
                let reason = os_error_text(&e);
                debug!(handle = self.socket.handle(), %reason, "write failed");
                Err(SocketError::Send(reason))
            }
        }
    }

    /// Address this socket connected to
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Local address chosen for the connection
    pub fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        self.socket.local_addr()
    }

    /// Stream or datagram, as requested at construction
    pub fn protocol(&self) -> ProtocolType {
        self.socket.protocol()
    }

    /// Advisory buffer-size hint given at construction
    pub fn buffer_size_hint(&self) -> u16 {
        self.socket.buffer_size_hint()
    }

    /// Raw OS handle; the socket keeps ownership and still closes it
    pub fn raw_handle(&self) -> SocketHandle {
        self.socket.handle()
    }

    /// Give up ownership of the handle without closing it
    pub fn into_raw_handle(self) -> SocketHandle {
        self.socket.into_raw_handle()
    }
}

#[cfg(unix)]
impl AsFd for ClientSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.socket.as_fd()
    }
}

#[cfg(unix)]
impl AsRawFd for ClientSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

#[cfg(windows)]
impl AsSocket for ClientSocket {
    fn as_socket(&self) -> BorrowedSocket<'_> {
        self.socket.as_socket()
    }
}

#[cfg(windows)]
impl AsRawSocket for ClientSocket {
    fn as_raw_socket(&self) -> RawSocket {
        self.socket.as_raw_socket()
    }
}
