//! Static per-class rate limit policy.
//!
//! Two fixed entries, token-based and IP-based, loaded once at startup and
//! never mutated. A ceiling of 0 is an explicit escape hatch meaning
//! "unlimited" for that class.

use std::time::Duration;

/// Classification of an identity key, derived from the key's shape alone.
///
/// Later stages re-derive the class without re-inspecting the original
/// request, so token keys carry a reserved prefix (see
/// [`TOKEN_KEY_PREFIX`](crate::limiter::key::TOKEN_KEY_PREFIX)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    /// Key derived from a bearer token header.
    Token,
    /// Key derived from the client IP address.
    Ip,
}

/// Ceiling and lockout duration for one key class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassPolicy {
    /// Maximum requests per window. 0 means unlimited (never denies).
    pub max_requests: u32,

    /// How long a key stays locked out after crossing the ceiling.
    pub lockout: Duration,
}

/// Immutable rate limit policy for the process lifetime.
///
/// The window length is itself a policy parameter shared by both classes,
/// not a hardcoded constant (default 1 second via configuration).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitPolicy {
    /// Fixed counting window length.
    pub window: Duration,

    token: ClassPolicy,
    ip: ClassPolicy,
}

impl LimitPolicy {
    /// Create a policy from a window length and the two class entries.
    pub fn new(window: Duration, token: ClassPolicy, ip: ClassPolicy) -> Self {
        Self { window, token, ip }
    }

    /// Look up the ceiling and lockout duration for a key class.
    pub fn for_class(&self, class: KeyClass) -> ClassPolicy {
        match class {
            KeyClass::Token => self.token,
            KeyClass::Ip => self.ip,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn policy() -> LimitPolicy {
        LimitPolicy::new(
            Duration::from_secs(1),
            ClassPolicy {
                max_requests: 100,
                lockout: Duration::from_secs(300),
            },
            ClassPolicy {
                max_requests: 10,
                lockout: Duration::from_secs(60),
            },
        )
    }

    #[test]
    fn test_class_lookup_is_independent() {
        let policy = policy();

        let token = policy.for_class(KeyClass::Token);
        let ip = policy.for_class(KeyClass::Ip);

        assert_eq!(token.max_requests, 100);
        assert_eq!(token.lockout, Duration::from_secs(300));
        assert_eq!(ip.max_requests, 10);
        assert_eq!(ip.lockout, Duration::from_secs(60));
    }

    #[test]
    fn test_window_is_shared() {
        let policy = policy();
        assert_eq!(policy.window, Duration::from_secs(1));
    }
}
