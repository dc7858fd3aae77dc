//! Winsock implementation of [`SocketSys`]

use std::io;
use std::mem;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::os::windows::io::IntoRawSocket;
use std::ptr;
use std::sync::OnceLock;

use entities_socket::SocketHandle;
use socket2::{Domain, Socket as Socket2};
use windows_sys::Win32::Networking::WinSock::{
    closesocket, FreeAddrInfoW, GetAddrInfoW, WSAGetLastError, WSAStartup, ADDRINFOW, AF_INET,
    AF_INET6, AF_UNSPEC, AI_PASSIVE, SOCKADDR, SOCKADDR_IN, SOCKADDR_IN6, SOCKET_ERROR, WSADATA,
};
use windows_sys::Win32::System::Diagnostics::Debug::{
    FormatMessageW, FORMAT_MESSAGE_FROM_SYSTEM, FORMAT_MESSAGE_IGNORE_INSERTS,
};

use super::{unknown_error_text, SocketSys};
use crate::socket::ProtocolType;

/// Winsock 2.2
const WINSOCK_VERSION: u16 = 0x0202;

/// Winsock
pub(crate) struct WindowsSys;

/// Initialise Winsock once per process; later calls return the first result
fn startup() -> Result<(), String> {
    static STARTUP: OnceLock<i32> = OnceLock::new();
    let rc = *STARTUP.get_or_init(|| {
        // SAFETY: WSADATA is a plain C struct filled in by WSAStartup.
        let mut data: WSADATA = unsafe { mem::zeroed() };
        unsafe { WSAStartup(WINSOCK_VERSION, &mut data) }
    });
    if rc == 0 {
        Ok(())
    } else {
        Err(WindowsSys::describe_error(rc))
    }
}

impl SocketSys for WindowsSys {
    const SEND_FLAGS: i32 = 0;

    fn open(domain: Domain, protocol: ProtocolType) -> io::Result<SocketHandle> {
        startup().map_err(io::Error::other)?;
        Socket2::new(domain, protocol.into(), None).map(|s| s.into_raw_socket() as SocketHandle)
    }

    fn close(handle: SocketHandle) -> io::Result<()> {
        // SAFETY: handle was produced by open and is closed exactly once.
        if unsafe { closesocket(handle) } == SOCKET_ERROR {
            return Err(io::Error::from_raw_os_error(Self::last_error_code()));
        }
        Ok(())
    }

    fn last_error_code() -> i32 {
        // SAFETY: reads thread-local Winsock state only.
        unsafe { WSAGetLastError() }
    }

    fn describe_error(code: i32) -> String {
        let mut buffer = [0u16; 512];
        // SAFETY: buffer is writable for buffer.len() UTF-16 units.
        let len = unsafe {
            FormatMessageW(
                FORMAT_MESSAGE_FROM_SYSTEM | FORMAT_MESSAGE_IGNORE_INSERTS,
                ptr::null(),
                code as u32,
                0,
                buffer.as_mut_ptr(),
                buffer.len() as u32,
                ptr::null(),
            )
        };
        if len == 0 {
            return unknown_error_text(code);
        }
        let text = String::from_utf16_lossy(&buffer[..len as usize]);
        let text = text.trim_end();
        if text.is_empty() {
            unknown_error_text(code)
        } else {
            text.to_string()
        }
    }

    fn resolve_address(
        host: Option<&str>,
        port: u16,
        protocol: ProtocolType,
    ) -> Result<AddrInfoList, String> {
        startup()?;
        if host.is_some_and(|h| h.contains('\0')) {
            return Err("address contains an interior NUL byte".to_string());
        }
        let node = host.map(wide);
        let service = wide(&port.to_string());

        // SAFETY: ADDRINFOW is a plain C struct; all-zero means "no hints".
        let mut hints: ADDRINFOW = unsafe { mem::zeroed() };
        hints.ai_socktype = protocol.raw_type();
        if node.is_none() {
            hints.ai_family = AF_INET as i32;
            hints.ai_flags = AI_PASSIVE as i32;
        } else {
            hints.ai_family = AF_UNSPEC as i32;
        }

        let mut head: *mut ADDRINFOW = ptr::null_mut();
        // SAFETY: node/service are NUL-terminated UTF-16 buffers that outlive
        // the call; head receives an owned list.
        let rc = unsafe {
            GetAddrInfoW(
                node.as_ref().map_or(ptr::null(), |n| n.as_ptr()),
                service.as_ptr(),
                &hints,
                &mut head,
            )
        };
        if rc != 0 {
            return Err(Self::describe_error(rc));
        }

        Ok(AddrInfoList { head })
    }
}

fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Owned `GetAddrInfoW` result, released with `FreeAddrInfoW` on drop
pub(crate) struct AddrInfoList {
    head: *mut ADDRINFOW,
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
            // SAFETY: head came from a successful GetAddrInfoW and is freed once.
            unsafe { FreeAddrInfoW(self.head) };
            self.head = ptr::null_mut();
        }
    }
}

unsafe fn socket_addr_from_raw(addr: *const SOCKADDR, len: usize) -> Option<SocketAddr> {
    if addr.is_null() {
        return None;
    }
    let family = (*addr).sa_family;
    if family == AF_INET && len >= mem::size_of::<SOCKADDR_IN>() {
        let sin = &*(addr as *const SOCKADDR_IN);
        let ip = Ipv4Addr::from(u32::from_be(sin.sin_addr.S_un.S_addr));
        let port = u16::from_be(sin.sin_port);
        Some(SocketAddr::V4(SocketAddrV4::new(ip, port)))
    } else if family == AF_INET6 && len >= mem::size_of::<SOCKADDR_IN6>() {
        let sin6 = &*(addr as *const SOCKADDR_IN6);
        Some(SocketAddr::V6(SocketAddrV6::new(
            Ipv6Addr::from(sin6.sin6_addr.u.Byte),
            u16::from_be(sin6.sin6_port),
            sin6.sin6_flowinfo,
            sin6.Anonymous.sin6_scope_id,
        )))
    } else {
        None
    }
}
