//! Bearer credential attached to outbound upstream calls.

use serde::{Deserialize, Serialize};

/// Opaque bearer credential. `Debug` and `Display` never print the secret.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Per-call override wins over the configured default for that call only.
    pub fn select<'a>(
        explicit: Option<&'a Credential>,
        default: Option<&'a Credential>,
    ) -> Option<&'a Credential> {
        explicit.filter(|c| !c.is_empty()).or(default)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(****)")
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("****")
    }
}

impl From<String> for Credential {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Credential {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let cred = Credential::new("sk-secret");
        assert_eq!(format!("{:?}", cred), "Credential(****)");
        assert_eq!(cred.to_string(), "****");
        assert_eq!(cred.expose(), "sk-secret");
    }

    #[test]
    fn test_select_prefers_explicit() {
        let default = Credential::new("default");
        let explicit = Credential::new("explicit");
        let blank = Credential::new("  ");

        assert_eq!(
            Credential::select(Some(&explicit), Some(&default)),
            Some(&explicit)
        );
        assert_eq!(Credential::select(None, Some(&default)), Some(&default));
        assert_eq!(Credential::select(Some(&blank), Some(&default)), Some(&default));
        assert_eq!(Credential::select(None, None), None);
    }
}
