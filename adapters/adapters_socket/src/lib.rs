//! Adapters Layer: Sockets
//!
//! Provides move-only socket types that own raw OS socket handles (POSIX
//! descriptors or Winsock `SOCKET`s) and release them exactly once.
//!
//! ## Overview
//!
//! The `adapters_socket` crate provides:
//! - **ServerSocket**: a bound endpoint; stream sockets also listen
//! - **ClientSocket**: a connected endpoint with a single-send `write`
//! - **Error reporting**: [`SocketError`] and [`get_last_error`], the one place
//!   platform error codes become text
//! - **Accounting**: every open handle is counted in a shared
//!   [`SocketCounter`]
//!
//! All operations are synchronous. Neither socket type is `Clone`; moving a
//! socket moves ownership of its handle, so a handle is never closed twice.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use adapters_socket::{ClientSocket, ProtocolType, ServerSocket, SocketCounter};
//!
//! let counter = SocketCounter::new();
//! let server = ServerSocket::new(7000, ProtocolType::Stream, 4096, &counter)?;
//! let mut client = ClientSocket::new("127.0.0.1", 7000, ProtocolType::Stream, 4096, &counter)?;
//! let written = client.write(b"hello")?;
//! assert!(written <= 5);
//! assert_eq!(counter.live(), 2);
//! # drop(server);
//! # Ok::<(), adapters_socket::SocketError>(())
//! ```
//!
//! ## Architecture
//!
//! This crate is part of the adapters layer. It depends on:
//! - `entities_socket`: handle type, validity predicates, live-socket counter
//!
//! Platform differences are confined to the private `sys` module.

pub mod client;
pub mod config;
pub mod error;
pub mod server;
pub mod socket;

mod sys;

pub use client::ClientSocket;
pub use config::{SocketConfig, DEFAULT_BACKLOG, DEFAULT_BUFFER_SIZE_HINT};
pub use error::{describe_error, get_last_error, SocketError};
pub use server::ServerSocket;
pub use socket::ProtocolType;

pub use entities_socket::{
    handle_invalid, handle_valid, LiveSlot, SocketCounter, SocketHandle, INVALID_SOCKET_HANDLE,
};
