//! Server Socket Module
//!
//! A bound socket; stream sockets are also put into listening mode.

use std::net::SocketAddr;
#[cfg(unix)]
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd, RawFd};
#[cfg(windows)]
use std::os::windows::io::{AsRawSocket, AsSocket, BorrowedSocket, RawSocket};

use entities_socket::{SocketCounter, SocketHandle};
use socket2::{Domain, SockAddr};
use tracing::{debug, warn};

use crate::config::SocketConfig;
use crate::error::{os_error_text, SocketError};
use crate::socket::{ProtocolType, Socket};
use crate::sys::{AddrInfoList, SocketSys, Sys};

/// Address shown in errors for the passive lookup
const WILDCARD: &str = "*";

/// Bound (and for streams, listening) endpoint
///
/// Owns its handle and the resolved address list it was bound from; both are
/// released when the `ServerSocket` is dropped. Moving a `ServerSocket` moves
/// that ownership, so the moved-from binding can never close anything.
#[derive(Debug)]
pub struct ServerSocket {
    socket: Socket,
    addr_info: AddrInfoList,
    port: u16,
}

impl ServerSocket {
    /// Bind `port` on all IPv4 interfaces
    ///
    /// # Arguments
    ///
    /// * `port` - Local port; `0` lets the OS pick one (see
    ///   [`local_addr`](Self::local_addr))
    /// * `protocol` - Stream or datagram
    /// * `buffer_size_hint` - Advisory receive-buffer size
    /// * `counter` - Live-socket counter this socket reports to
    ///
    /// # Returns
    ///
    /// * `Ok(ServerSocket)` - Bound socket, listening if `protocol` is `Stream`
    /// * `Err(SocketError)` - `Resolve`, `Open`, `Bind` or `Listen`; nothing is
    ///   left open and the counter is unchanged
    pub fn new(
        port: u16,
        protocol: ProtocolType,
        buffer_size_hint: u16,
        counter: &SocketCounter,
    ) -> Result<Self, SocketError> {
        Self::with_config(
            port,
            &SocketConfig::new(protocol, buffer_size_hint),
            counter,
        )
    }

    /// Bind `port` using every setting in `config`
    pub fn with_config(
        port: u16,
        config: &SocketConfig,
        counter: &SocketCounter,
    ) -> Result<Self, SocketError> {
        let resolve_error = |reason: String| {
            warn!(port, %reason, "local address resolution failed");
            SocketError::Resolve {
                address: WILDCARD.to_string(),
                port,
                reason,
            }
        };
        let addr_info =
            Sys::resolve_address(None, port, config.protocol).map_err(resolve_error)?;
        let address = addr_info
            .addresses()
            .into_iter()
            .next()
            .ok_or_else(|| resolve_error("no usable local address".to_string()))?;

        let socket = Socket::open(
            Domain::for_address(address),
            config.protocol,
            config.buffer_size_hint,
            counter,
        )?;

        socket
            .sock_ref()
            .bind(&SockAddr::from(address))
            .map_err(|e| {
                let reason = os_error_text(&e);
                warn!(port, %reason, "bind failed");
                SocketError::Bind { port, reason }
            })?;

        if config.protocol == ProtocolType::Stream {
            socket.sock_ref().listen(config.backlog).map_err(|e| {
                let reason = os_error_text(&e);
                warn!(port, %reason, "listen failed");
                SocketError::Listen { port, reason }
            })?;
        }

        debug!(
            handle = socket.handle(),
            %address,
            protocol = ?config.protocol,
            backlog = config.backlog,
            "server socket ready"
        );

        Ok(Self {
            socket,
            addr_info,
            port,
        })
    }

    /// Port requested at construction (`0` if the OS picked one)
    pub fn requested_port(&self) -> u16 {
        self.port
    }

    /// Address the socket is actually bound to
    pub fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        self.socket.local_addr()
    }

    /// Addresses the resolver returned for the bind
    pub fn resolved_addresses(&self) -> Vec<SocketAddr> {
        self.addr_info.addresses()
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
impl AsFd for ServerSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.socket.as_fd()
    }
}

#[cfg(unix)]
impl AsRawFd for ServerSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

#[cfg(windows)]
impl AsSocket for ServerSocket {
    fn as_socket(&self) -> BorrowedSocket<'_> {
        self.socket.as_socket()
    }
}

#[cfg(windows)]
impl AsRawSocket for ServerSocket {
    fn as_raw_socket(&self) -> RawSocket {
        self.socket.as_raw_socket()
    }
}
