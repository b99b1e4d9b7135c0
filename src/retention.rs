//! Retention modes and the process-local retention-policy provider.

use std::collections::HashMap;

use parking_lot::RwLock;

/// How the archive coordinator should treat a stream once events beyond
/// its `ArchiveCutoffVersion` can be evicted.
///
/// Persisted numerically: `Default=0, ColdArchivable=1, FullHistory=2,
/// HardDeletable=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(i16)]
pub enum RetentionMode {
    /// No archival behavior; the archive coordinator ignores this stream.
    Default = 0,
    /// Events at or below the cutoff version are archived then pruned
    /// from the hot store.
    ColdArchivable = 1,
    /// Events at or below the cutoff version are archived but kept in
    /// the hot store too (full history preserved in both tiers).
    FullHistory = 2,
    /// Once `is_deleted` is set, the stream and all its events are
    /// permanently removed; no archive file is written.
    HardDeletable = 3,
}

impl RetentionMode {
    /// Converts from the numeric encoding persisted in the `streams` table.
    #[must_use]
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(RetentionMode::Default),
            1 => Some(RetentionMode::ColdArchivable),
            2 => Some(RetentionMode::FullHistory),
            3 => Some(RetentionMode::HardDeletable),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i16(self) -> i16 {
        self as i16
    }
}

/// Resolves the effective [`RetentionMode`] for a domain when the caller
/// doesn't supply one explicitly on append.
///
/// This is process-local configuration, not a database lookup: a mapping
/// from domain name to policy, with a default fallback, safe for
/// concurrent reads with writes only expected at configuration time.
#[derive(Debug)]
pub struct RetentionPolicyProvider {
    default: RetentionMode,
    by_domain: RwLock<HashMap<String, RetentionMode>>,
}

impl RetentionPolicyProvider {
    /// Creates a provider that falls back to `default` for any domain
    /// without an explicit policy.
    #[must_use]
    pub fn new(default: RetentionMode) -> Self {
        Self {
            default,
            by_domain: RwLock::new(HashMap::new()),
        }
    }

    /// Registers (or overwrites) the policy for a specific domain.
    pub fn set_policy(&self, domain: impl Into<String>, mode: RetentionMode) {
        self.by_domain.write().insert(domain.into(), mode);
    }

    /// Resolves the effective retention mode for `domain`.
    #[must_use]
    pub fn resolve(&self, domain: &str) -> RetentionMode {
        self.by_domain
            .read()
            .get(domain)
            .copied()
            .unwrap_or(self.default)
    }
}

impl Default for RetentionPolicyProvider {
    fn default() -> Self {
        Self::new(RetentionMode::Default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_for_unknown_domain() {
        let provider = RetentionPolicyProvider::new(RetentionMode::FullHistory);
        assert_eq!(provider.resolve("orders"), RetentionMode::FullHistory);
    }

    #[test]
    fn uses_domain_specific_override() {
        let provider = RetentionPolicyProvider::new(RetentionMode::Default);
        provider.set_policy("orders", RetentionMode::ColdArchivable);

        assert_eq!(provider.resolve("orders"), RetentionMode::ColdArchivable);
        assert_eq!(provider.resolve("invoices"), RetentionMode::Default);
    }

    #[test]
    fn numeric_encoding_round_trips() {
        for mode in [
            RetentionMode::Default,
            RetentionMode::ColdArchivable,
            RetentionMode::FullHistory,
            RetentionMode::HardDeletable,
        ] {
            assert_eq!(RetentionMode::from_i16(mode.as_i16()), Some(mode));
        }
        assert_eq!(RetentionMode::from_i16(99), None);
    }
}
