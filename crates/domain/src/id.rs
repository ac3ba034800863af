//! Session identifiers.

use std::fmt;

use uuid::Uuid;

/// Identifier of one operator session on the gateway.
///
/// Only used to correlate log lines, so it displays in the short
/// `simple` form rather than the hyphenated one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.simple(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_give_each_session_its_own_id() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn should_display_as_32_hex_digits() {
        let text = SessionId::new().to_string();
        assert_eq!(text.len(), 32);
        assert!(text.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
