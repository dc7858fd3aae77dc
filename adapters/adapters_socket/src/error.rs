//! Socket Errors
//!
//! Every failure the crate reports is a [`SocketError`], and every platform
//! error code is turned into text by [`describe_error`].

use std::io;

use thiserror::Error;

use crate::sys::{SocketSys, Sys};

/// Socket error types
///
/// Construction failures (`Open`, `Resolve`, `Bind`, `Listen`, `Connect`)
/// mean no socket was produced and nothing was leaked. `Send` is returned by
/// [`ClientSocket::write`](crate::ClientSocket::write) and leaves the socket
/// usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocketError {
    /// The OS refused to allocate a socket handle
    #[error("could not open socket: {0}")]
    Open(String),
    /// The address could not be resolved to anything usable
    #[error("could not resolve {address}:{port}: {reason}")]
    Resolve {
        address: String,
        port: u16,
        reason: String,
    },
    /// Binding the local address was rejected
    #[error("could not bind port {port}: {reason}")]
    Bind { port: u16, reason: String },
    /// Switching to listening mode was rejected
    #[error("could not listen on port {port}: {reason}")]
    Listen { port: u16, reason: String },
    /// No resolved address accepted the connection
    #[error("could not connect to {address}:{port}: {reason}")]
    Connect {
        address: String,
        port: u16,
        reason: String,
    },
    /// A send on a connected socket failed
    #[error("send failed: {0}")]
    Send(String),
    /// Querying the address of an open socket failed; the socket stays usable
    #[error("could not query socket address: {0}")]
    Address(String),
}

impl SocketError {
    /// Returns `true` for errors raised while constructing a socket
    pub fn is_construction_error(&self) -> bool {
        !matches!(self, SocketError::Send(_) | SocketError::Address(_))
    }
}

/// Description of the calling thread's most recent socket error
///
/// Never fails; codes the platform cannot translate produce a generic
/// "unknown socket error" text that still names the code. Reading the error
/// does not clear it.
pub fn get_last_error() -> String {
    Sys::describe_error(Sys::last_error_code())
}

/// Description of a specific platform socket error code
pub fn describe_error(code: i32) -> String {
    Sys::describe_error(code)
}

/// Text for an error returned by a socket call
pub(crate) fn os_error_text(err: &io::Error) -> String {
    match err.raw_os_error() {
        Some(code) => describe_error(code),
        None => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_last_error_never_empty() {
        assert!(!get_last_error().is_empty());
    }

    #[test]
    fn test_describe_error_unknown_code() {
        let text = describe_error(999_999);
        assert!(text.contains("999999"));
    }

    #[test]
    fn test_os_error_text_uses_platform_description() {
        #[cfg(unix)]
        let code = libc::ECONNRESET;
        #[cfg(windows)]
        let code = windows_sys::Win32::Networking::WinSock::WSAECONNRESET;

        let err = io::Error::from_raw_os_error(code);
        assert_eq!(os_error_text(&err), describe_error(code));
    }

    #[test]
    fn test_os_error_text_without_code() {
        let err = io::Error::other("custom failure");
        assert_eq!(os_error_text(&err), "custom failure");
    }

    #[test]
    fn test_display_messages() {
        let err = SocketError::Bind {
            port: 8080,
            reason: "EADDRINUSE: Address already in use".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "could not bind port 8080: EADDRINUSE: Address already in use"
        );

        let err = SocketError::Send("EPIPE: Broken pipe".to_string());
        assert_eq!(err.to_string(), "send failed: EPIPE: Broken pipe");
    }

    #[test]
    fn test_construction_classification() {
        assert!(SocketError::Open("x".into()).is_construction_error());
        assert!(SocketError::Listen {
            port: 1,
            reason: "x".into()
        }
        .is_construction_error());
        assert!(!SocketError::Send("x".into()).is_construction_error());
        assert!(!SocketError::Address("x".into()).is_construction_error());
    }
}
