//! Platform Capability Layer
//!
//! Everything that differs between the POSIX sockets API and Winsock lives
//! behind [`SocketSys`]. Exactly one implementation is compiled in, selected by
//! target, and re-exported as [`Sys`]; the rest of the crate only talks to
//! `Sys` through the trait.
//!
//! Operations that behave the same everywhere once a handle exists (bind,
//! listen, connect, send, address queries) are not part of the trait; they go
//! through `socket2::SockRef` borrowed from the owned handle.

use std::fmt;
use std::io;

use entities_socket::{handle_valid, SocketHandle};
use socket2::Domain;

use crate::socket::ProtocolType;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub(crate) use unix::{AddrInfoList, UnixSys as Sys};
#[cfg(windows)]
pub(crate) use windows::{AddrInfoList, WindowsSys as Sys};

impl fmt::Debug for AddrInfoList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.addresses()).finish()
    }
}

/// Fallback text for error codes the platform cannot translate
pub(crate) fn unknown_error_text(code: i32) -> String {
    format!("unknown socket error (code {})", code)
}

/// Socket primitives that need a per-platform implementation
pub(crate) trait SocketSys {
    /// Flags passed to every `send`
    const SEND_FLAGS: i32;

    /// Open a new socket handle for `domain` and `protocol`
    fn open(domain: Domain, protocol: ProtocolType) -> io::Result<SocketHandle>;

    /// Close a handle previously returned by [`SocketSys::open`]
    fn close(handle: SocketHandle) -> io::Result<()>;

    /// Whether `handle` refers to an open socket
    fn is_valid_handle(handle: SocketHandle) -> bool {
        handle_valid(handle)
    }

    /// Error code of the calling thread's last failed socket call
    fn last_error_code() -> i32;

    /// Human-readable description of a platform error code
    fn describe_error(code: i32) -> String;

    /// Resolve `host:port` into an owned list of candidate addresses
    ///
    /// `None` for `host` asks for the passive (wildcard) IPv4 address used when
    /// binding a listening socket. On failure the returned string describes why.
    fn resolve_address(
        host: Option<&str>,
        port: u16,
        protocol: ProtocolType,
    ) -> Result<AddrInfoList, String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use entities_socket::INVALID_SOCKET_HANDLE;

    #[test]
    fn test_open_close_stream() {
        let handle = Sys::open(Domain::IPV4, ProtocolType::Stream).unwrap();
        assert!(Sys::is_valid_handle(handle));
        assert!(Sys::close(handle).is_ok());
    }

    #[test]
    fn test_open_close_datagram() {
        let handle = Sys::open(Domain::IPV4, ProtocolType::Datagram).unwrap();
        assert!(Sys::is_valid_handle(handle));
        assert!(Sys::close(handle).is_ok());
    }

    #[test]
    fn test_sentinel_not_valid() {
        assert!(!Sys::is_valid_handle(INVALID_SOCKET_HANDLE));
    }

    #[test]
    fn test_describe_unknown_code_falls_back() {
        let text = Sys::describe_error(-12345);
        assert!(!text.is_empty());
    }

    #[test]
    fn test_resolve_passive() {
        let list = Sys::resolve_address(None, 8080, ProtocolType::Stream).unwrap();
        let addresses = list.addresses();
        assert!(!addresses.is_empty());
        assert!(addresses.iter().all(|a| a.port() == 8080 && a.is_ipv4()));
        assert!(addresses[0].ip().is_unspecified());
    }

    #[test]
    fn test_resolve_numeric_host() {
        let list = Sys::resolve_address(Some("127.0.0.1"), 9000, ProtocolType::Datagram).unwrap();
        let addresses = list.addresses();
        assert_eq!(addresses.len(), 1);
        assert_eq!(addresses[0], "127.0.0.1:9000".parse().unwrap());
    }

    #[test]
    fn test_resolve_rejects_interior_nul() {
        let reason = Sys::resolve_address(Some("local\0host"), 80, ProtocolType::Stream)
            .err()
            .unwrap();
        assert!(reason.contains("NUL"));
    }
}
