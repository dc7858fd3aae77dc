//! Socket Module
//!
//! Provides the handle ownership shared by listening and connected sockets.
//! A [`Socket`] owns exactly one OS handle, closes it exactly once when
//! dropped, and keeps the shared [`SocketCounter`] in step with the number of
//! handles that are open.

use std::io;
use std::mem;
use std::net::SocketAddr;
#[cfg(unix)]
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd, RawFd};
#[cfg(windows)]
use std::os::windows::io::{AsRawSocket, AsSocket, BorrowedSocket, RawSocket};

use entities_socket::{LiveSlot, SocketCounter, SocketHandle, INVALID_SOCKET_HANDLE};
use socket2::{Domain, SockRef, Type};
use tracing::{debug, warn};

use crate::error::{os_error_text, SocketError};
use crate::sys::{SocketSys, Sys};

/// Transport protocol of a socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolType {
    /// Connection-oriented byte stream (TCP)
    Stream,
    /// Connectionless datagrams (UDP)
    Datagram,
}

impl ProtocolType {
    /// The platform's `SOCK_STREAM` / `SOCK_DGRAM` value
    pub fn raw_type(self) -> i32 {
        i32::from(Type::from(self))
    }
}

impl From<ProtocolType> for Type {
    fn from(protocol: ProtocolType) -> Self {
        match protocol {
            ProtocolType::Stream => Type::STREAM,
            ProtocolType::Datagram => Type::DGRAM,
        }
    }
}

/// Owned socket handle plus the metadata every socket carries
///
/// Not `Clone`: a handle has one owner. Dropping a `Socket` that holds a valid
/// handle closes it and releases its slot in the counter; dropping one that
/// holds [`INVALID_SOCKET_HANDLE`] does nothing. `slot` is `Some` exactly while
/// `handle` is valid.
#[derive(Debug)]
pub(crate) struct Socket {
    handle: SocketHandle,
    protocol: ProtocolType,
    buffer_size_hint: u16,
    slot: Option<LiveSlot>,
}

impl Socket {
    /// Open a new handle for `domain` and `protocol`
    ///
    /// The counter is only incremented once the handle is known to be usable.
    pub(crate) fn open(
        domain: Domain,
        protocol: ProtocolType,
        buffer_size_hint: u16,
        counter: &SocketCounter,
    ) -> Result<Self, SocketError> {
        let handle = Sys::open(domain, protocol).map_err(|e| open_error(protocol, &e))?;
        let handle = usable_handle(handle)?;

        let slot = counter.acquire();
        debug!(handle, ?protocol, buffer_size_hint, live = slot.live(), "socket opened");

        Ok(Self {
            handle,
            protocol,
            buffer_size_hint,
            slot: Some(slot),
        })
    }

    pub(crate) fn handle(&self) -> SocketHandle {
        self.handle
    }

    pub(crate) fn protocol(&self) -> ProtocolType {
        self.protocol
    }

    pub(crate) fn buffer_size_hint(&self) -> u16 {
        self.buffer_size_hint
    }

    /// Borrow the handle as a `socket2` socket for one call
    pub(crate) fn sock_ref(&self) -> SockRef<'_> {
        SockRef::from(self)
    }

    pub(crate) fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        let addr = self
            .sock_ref()
            .local_addr()
            .map_err(|e| SocketError::Address(os_error_text(&e)))?;
        addr.as_socket()
            .ok_or_else(|| SocketError::Address("not an IP socket address".to_string()))
    }

    /// Give up ownership of the handle without closing it
    ///
    /// The handle stops counting as live; closing it becomes the caller's job.
    pub(crate) fn into_raw_handle(mut self) -> SocketHandle {
        let handle = mem::replace(&mut self.handle, INVALID_SOCKET_HANDLE);
        let live = self.slot.take().map(LiveSlot::release);
        debug!(handle, ?live, "socket handle released to caller");
        handle
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        if !Sys::is_valid_handle(self.handle) {
            return;
        }
        let handle = mem::replace(&mut self.handle, INVALID_SOCKET_HANDLE);
        if let Err(e) = Sys::close(handle) {
            warn!(handle, reason = %os_error_text(&e), "socket close failed");
        }
        let live = self.slot.take().map(LiveSlot::release);
        debug!(handle, ?live, "socket closed");
    }
}

fn open_error(protocol: ProtocolType, err: &io::Error) -> SocketError {
    let reason = os_error_text(err);
    warn!(?protocol, %reason, "socket open failed");
    SocketError::Open(reason)
}

/// Accept `handle` only if it passes the validity rule; otherwise close it
fn usable_handle(handle: SocketHandle) -> Result<SocketHandle, SocketError> {
    if Sys::is_valid_handle(handle) {
        return Ok(handle);
    }
    // Descriptor 0 is a real resource but not one we accept as a socket.
    if let Err(e) = Sys::close(handle) {
        warn!(handle, reason = %os_error_text(&e), "close of rejected handle failed");
    }
    Err(SocketError::Open(format!("platform returned unusable handle {}", handle)))
}

#[cfg(unix)]
impl AsFd for Socket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        // SAFETY: a Socket reachable through &self always holds the open
        // descriptor it owns; it is only invalidated by drop/into_raw_handle.
        unsafe { BorrowedFd::borrow_raw(self.handle) }
    }
}

#[cfg(unix)]
impl AsRawFd for Socket {
    fn as_raw_fd(&self) -> RawFd {
        self.handle
    }
}

#[cfg(windows)]
impl AsSocket for Socket {
    fn as_socket(&self) -> BorrowedSocket<'_> {
        // SAFETY: a Socket reachable through &self always holds the open
        // handle it owns; it is only invalidated by drop/into_raw_handle.
        unsafe { BorrowedSocket::borrow_raw(self.handle as RawSocket) }
    }
}

#[cfg(windows)]
impl AsRawSocket for Socket {
    fn as_raw_socket(&self) -> RawSocket {
        self.handle as RawSocket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::describe_error;
    use entities_socket::handle_valid;
    use std::net::Ipv4Addr;

    #[test]
    fn test_protocol_type_conversion() {
        assert_eq!(Type::from(ProtocolType::Stream), Type::STREAM);
        assert_eq!(Type::from(ProtocolType::Datagram), Type::DGRAM);
    }

    #[test]
    fn test_raw_type_matches_platform_constants() {
        #[cfg(unix)]
        {
            assert_eq!(ProtocolType::Stream.raw_type(), libc::SOCK_STREAM);
            assert_eq!(ProtocolType::Datagram.raw_type(), libc::SOCK_DGRAM);
        }
        assert_ne!(
            ProtocolType::Stream.raw_type(),
            ProtocolType::Datagram.raw_type()
        );
    }

    #[test]
    fn test_open_counts_and_drop_releases() {
        let counter = SocketCounter::new();
        let socket = Socket::open(Domain::IPV4, ProtocolType::Stream, 1024, &counter).unwrap();
        assert!(handle_valid(socket.handle()));
        assert_eq!(counter.live(), 1);
        assert_eq!(socket.protocol(), ProtocolType::Stream);
        assert_eq!(socket.buffer_size_hint(), 1024);

        drop(socket);
        assert_eq!(counter.live(), 0);
    }

    #[test]
    fn test_datagram_open() {
        let counter = SocketCounter::new();
        let socket = Socket::open(Domain::IPV4, ProtocolType::Datagram, 0, &counter).unwrap();
        assert_eq!(socket.sock_ref().r#type().unwrap(), Type::DGRAM);
        assert_eq!(counter.live(), 1);
    }

    #[test]
    fn test_move_does_not_touch_counter() {
        let counter = SocketCounter::new();
        let socket = Socket::open(Domain::IPV4, ProtocolType::Stream, 0, &counter).unwrap();
        let handle = socket.handle();

        let moved = socket;
        assert_eq!(counter.live(), 1);
        assert_eq!(moved.handle(), handle);

        let boxed = Box::new(moved);
        assert_eq!(counter.live(), 1);
        drop(boxed);
        assert_eq!(counter.live(), 0);
    }

    #[test]
    fn test_into_raw_handle_releases_ownership() {
        let counter = SocketCounter::new();
        let socket = Socket::open(Domain::IPV4, ProtocolType::Stream, 0, &counter).unwrap();
        let handle = socket.into_raw_handle();

        assert!(handle_valid(handle));
        assert_eq!(counter.live(), 0);
        Sys::close(handle).unwrap();
    }

    #[test]
    fn test_unusable_handle_rejected() {
        match usable_handle(INVALID_SOCKET_HANDLE) {
            Err(SocketError::Open(reason)) => {
                assert!(reason.contains(&INVALID_SOCKET_HANDLE.to_string()));
            }
            other => panic!("expected Open error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_descriptor_zero_is_unusable() {
        // Only the predicate is checked; closing the real descriptor 0 would
        // take stdin away from the test harness.
        assert!(!Sys::is_valid_handle(0));
    }

    #[test]
    fn test_open_error_carries_platform_text() {
        #[cfg(unix)]
        let code = libc::EMFILE;
        #[cfg(windows)]
        let code = windows_sys::Win32::Networking::WinSock::WSAEMFILE;

        let err = open_error(ProtocolType::Stream, &io::Error::from_raw_os_error(code));
        assert_eq!(err, SocketError::Open(describe_error(code)));
        assert!(err.is_construction_error());
    }

    #[test]
    fn test_local_addr_after_bind() {
        let counter = SocketCounter::new();
        let socket = Socket::open(Domain::IPV4, ProtocolType::Stream, 0, &counter).unwrap();
        let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
        socket.sock_ref().bind(&addr.into()).unwrap();

        let local = socket.local_addr().unwrap();
        assert_eq!(local.ip(), Ipv4Addr::LOCALHOST);
        assert!(local.port() > 0);
    }
}
