//! Entities Layer: Socket Handles
//!
//! Provides the platform-independent vocabulary for owning OS socket resources.
//! This crate has no dependencies and performs no I/O; it only describes what a
//! socket handle is and how many of them are currently open.
//!
//! ## Overview
//!
//! The `entities_socket` crate provides:
//! - **Handles**: the platform-selected [`SocketHandle`] type together with the
//!   [`handle_valid`] / [`handle_invalid`] predicates
//! - **Accounting**: [`SocketCounter`], a shared atomic count of live sockets
//!
//! ## Usage
//!
//! ```rust
//! use entities_socket::{handle_valid, SocketCounter, INVALID_SOCKET_HANDLE};
//!
//! let counter = SocketCounter::new();
//! assert_eq!(counter.live(), 0);
//! assert!(!handle_valid(INVALID_SOCKET_HANDLE));
//! ```
//!
//! ## See Also
//!
//! - [`adapters_socket`](../adapters_socket/index.html): opens, binds, connects
//!   and closes the handles described here

pub mod counter;
pub mod handle;

pub use counter::{LiveSlot, SocketCounter};
pub use handle::{handle_invalid, handle_valid, SocketHandle, INVALID_SOCKET_HANDLE};
