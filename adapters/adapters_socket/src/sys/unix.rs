//! POSIX sockets implementation of [`SocketSys`]

use std::ffi::{CStr, CString};
use std::io;
use std::mem;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::os::unix::io::IntoRawFd;
use std::ptr;

use entities_socket::SocketHandle;
use nix::errno::Errno;
use socket2::{Domain, Socket as Socket2};

use super::{unknown_error_text, SocketSys};
use crate::socket::ProtocolType;

/// Platforms where `send` accepts `MSG_NOSIGNAL`. Apple targets get
/// `SO_NOSIGPIPE` from socket2 when the socket is created instead.
#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
const NO_SIGPIPE_FLAGS: i32 = libc::MSG_NOSIGNAL;

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
)))]
const NO_SIGPIPE_FLAGS: i32 = 0;

/// POSIX sockets
pub(crate) struct UnixSys;

impl SocketSys for UnixSys {
    const SEND_FLAGS: i32 = NO_SIGPIPE_FLAGS;

    fn open(domain: Domain, protocol: ProtocolType) -> io::Result<SocketHandle> {
        // socket2 sets close-on-exec (and SO_NOSIGPIPE on Apple) for us.
        Socket2::new(domain, protocol.into(), None).map(IntoRawFd::into_raw_fd)
    }

    fn close(handle: SocketHandle) -> io::Result<()> {
        nix::unistd::close(handle).map_err(io::Error::from)
    }

    fn last_error_code() -> i32 {
        Errno::last() as i32
    }

    fn describe_error(code: i32) -> String {
        match Errno::from_i32(code) {
            Errno::UnknownErrno => unknown_error_text(code),
            errno => format!("{:?}: {}", errno, errno.desc()),
        }
    }

    fn resolve_address(
        host: Option<&str>,
        port: u16,
        protocol: ProtocolType,
    ) -> Result<AddrInfoList, String> {
        let node = host
            .map(CString::new)
            .transpose()
            .map_err(|_| "address contains an interior NUL byte".to_string())?;
        let service = CString::new(port.to_string())
            .map_err(|_| "port contains an interior NUL byte".to_string())?;

        // SAFETY: addrinfo is a plain C struct; all-zero is the documented
        // "no hints" state that the fields below refine.
        let mut hints: libc::addrinfo = unsafe { mem::zeroed() };
        hints.ai_socktype = protocol.raw_type();
        hints.ai_flags = libc::AI_NUMERICSERV;
        if node.is_none() {
            hints.ai_family = libc::AF_INET;
            hints.ai_flags |= libc::AI_PASSIVE;
        } else {
            hints.ai_family = libc::AF_UNSPEC;
        }

        let mut head: *mut libc::addrinfo = ptr::null_mut();
        // SAFETY: node/service are valid NUL-terminated strings (or null for a
        // passive lookup) that outlive the call; head receives an owned list.
        let rc = unsafe {
            libc::getaddrinfo(
                node.as_ref().map_or(ptr::null(), |n| n.as_ptr()),
                service.as_ptr(),
                &hints,
                &mut head,
            )
        };
        if rc != 0 {
            return Err(resolver_error_text(rc));
        }

        Ok(AddrInfoList { head })
    }
}

/// The resolver reports its own error codes; only `EAI_SYSTEM` defers to errno.
fn resolver_error_text(code: i32) -> String {
    if code == libc::EAI_SYSTEM {
        return UnixSys::describe_error(UnixSys::last_error_code());
    }
    // SAFETY: gai_strerror returns a pointer to a static NUL-terminated string.
    let text = unsafe { CStr::from_ptr(libc::gai_strerror(code)) };
    let text = text.to_string_lossy();
    if text.is_empty() {
        unknown_error_text(code)
    } else {
        text.into_owned()
    }
}

/// Owned `getaddrinfo` result, released with `freeaddrinfo` on drop
pub(crate) struct AddrInfoList {
    head: *mut libc::addrinfo,
}

// The list is never shared; moving it to another thread moves sole ownership.
unsafe impl Send for AddrInfoList {}

impl AddrInfoList {
    /// Usable IPv4/IPv6 addresses in resolver order
    pub(crate) fn addresses(&self) -> Vec<SocketAddr> {
        let mut addresses = Vec::new();
        let mut node = self.head;
        while !node.is_null() {
            // SAFETY: node is a live element of the list owned by self.
            let entry = unsafe { &*node };
            // SAFETY: ai_addr/ai_addrlen describe a sockaddr owned by the list.
            let address = unsafe { socket_addr_from_raw(entry.ai_addr, entry.ai_addrlen) };
            addresses.extend(address);
            node = entry.ai_next;
        }
        addresses
    }
}

impl Drop for AddrInfoList {
    fn drop(&mut self) {
        if !self.head.is_null() {
            // SAFETY: head came from a successful getaddrinfo and is freed once.
            unsafe { libc::freeaddrinfo(self.head) };
            self.head = ptr::null_mut();
        }
    }
}

unsafe fn socket_addr_from_raw(
    addr: *const libc::sockaddr,
    len: libc::socklen_t,
) -> Option<SocketAddr> {
    if addr.is_null() {
        return None;
    }
    let len = len as usize;
    match i32::from((*addr).sa_family) {
        libc::AF_INET if len >= mem::size_of::<libc::sockaddr_in>() => {
            let sin = &*(addr as *const libc::sockaddr_in);
            let ip = Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr));
            let port = u16::from_be(sin.sin_port);
            Some(SocketAddr::V4(SocketAddrV4::new(ip, port)))
        }
        libc::AF_INET6 if len >= mem::size_of::<libc::sockaddr_in6>() => {
            let sin6 = &*(addr as *const libc::sockaddr_in6);
            Some(SocketAddr::V6(SocketAddrV6::new(
                Ipv6Addr::from(sin6.sin6_addr.s6_addr),
                u16::from_be(sin6.sin6_port),
                sin6.sin6_flowinfo,
                sin6.sin6_scope_id,
            )))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_known_errno() {
        let text = UnixSys::describe_error(libc::ECONNREFUSED);
        assert!(text.starts_with("ECONNREFUSED"));
    }

    #[test]
    fn test_resolver_error_text_not_empty() {
        assert!(!resolver_error_text(libc::EAI_NONAME).is_empty());
    }

    #[test]
    fn test_empty_list_drop_is_noop() {
        let list = AddrInfoList {
            head: ptr::null_mut(),
        };
        assert!(list.addresses().is_empty());
        drop(list);
    }

    #[test]
    fn test_open_sets_cloexec() {
        let handle = UnixSys::open(Domain::IPV4, ProtocolType::Stream).unwrap();
        // SAFETY: handle is an open descriptor owned by this test.
        let flags = unsafe { libc::fcntl(handle, libc::F_GETFD) };
        assert!(flags >= 0);
        assert_ne!(flags & libc::FD_CLOEXEC, 0);
        UnixSys::close(handle).unwrap();
    }
}
