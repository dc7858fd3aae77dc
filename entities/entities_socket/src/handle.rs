//! Socket Handle Module
//!
//! Raw OS socket handle type and its validity rules.
//!
//! Windows hands out `SOCKET` values (an unsigned pointer-sized integer) and
//! marks failure with the dedicated `INVALID_SOCKET` sentinel. POSIX-like
//! systems hand out `int` descriptors; here only strictly positive descriptors
//! count as valid, so descriptor 0 and every negative value are treated as
//! "not an open socket".

/// Raw socket handle (`SOCKET` on Windows)
#[cfg(windows)]
pub type SocketHandle = usize;

/// Raw socket handle (file descriptor on POSIX-like systems)
#[cfg(not(windows))]
pub type SocketHandle = i32;

/// Sentinel for a handle that was never opened or has already been closed
#[cfg(windows)]
pub const INVALID_SOCKET_HANDLE: SocketHandle = !0;

/// Sentinel for a handle that was never opened or has already been closed
#[cfg(not(windows))]
pub const INVALID_SOCKET_HANDLE: SocketHandle = -1;

/// Returns `true` if `handle` does not refer to an open socket
#[cfg(windows)]
#[inline]
pub const fn handle_invalid(handle: SocketHandle) -> bool {
    handle == INVALID_SOCKET_HANDLE
}

/// Returns `true` if `handle` refers to an open socket
#[cfg(windows)]
#[inline]
pub const fn handle_valid(handle: SocketHandle) -> bool {
    handle != INVALID_SOCKET_HANDLE
}

/// Returns `true` if `handle` does not refer to an open socket
#[cfg(not(windows))]
#[inline]
pub const fn handle_invalid(handle: SocketHandle) -> bool {
    handle <= 0
}

/// Returns `true` if `handle` refers to an open socket
#[cfg(not(windows))]
#[inline]
pub const fn handle_valid(handle: SocketHandle) -> bool {
    handle > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_handles() -> Vec<SocketHandle> {
        let mut handles = vec![
            INVALID_SOCKET_HANDLE,
            SocketHandle::MIN,
            SocketHandle::MAX,
            0,
            1,
            2,
            3,
        ];
        handles.extend((0..4096).map(|h| h as SocketHandle));
        #[cfg(not(windows))]
        handles.extend((-4096..0).map(|h| h as SocketHandle));
        handles
    }

    #[test]
    fn test_invalid_sentinel_is_invalid() {
        assert!(handle_invalid(INVALID_SOCKET_HANDLE));
        assert!(!handle_valid(INVALID_SOCKET_HANDLE));
    }

    #[test]
    fn test_predicates_are_complements() {
        for handle in sample_handles() {
            assert_ne!(
                handle_valid(handle),
                handle_invalid(handle),
                "predicates disagree for handle {}",
                handle
            );
        }
    }

    #[cfg(not(windows))]
    #[test]
    fn test_posix_descriptor_rules() {
        assert!(handle_invalid(0));
        assert!(handle_invalid(-1));
        assert!(handle_invalid(i32::MIN));
        assert!(handle_valid(1));
        assert!(handle_valid(i32::MAX));
    }

    #[cfg(windows)]
    #[test]
    fn test_windows_sentinel_rules() {
        assert!(handle_valid(0));
        assert!(handle_valid(1));
        assert!(handle_invalid(usize::MAX));
    }

    // Evaluated at compile time; fails the build if the predicates stop being const.
    const _: () = assert!(handle_invalid(INVALID_SOCKET_HANDLE));
    const _: () = assert!(!handle_valid(INVALID_SOCKET_HANDLE));
}
