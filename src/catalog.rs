//! Static service catalog: canonical code -> (price reference, display name).
//!
//! The catalog is built once at startup from configuration and injected into
//! the parser and line-item builder as an immutable value. Invariants that
//! would otherwise surface as request-time ambiguity (overlapping display
//! names, duplicate codes) are rejected here, at construction.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// A validated canonical service code drawn from the catalog's key set.
///
/// Produced only by the catalog during resolution; handler and builder code
/// can rely on it referring to a real entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceCode(String);

impl ServiceCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One purchasable service.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CatalogEntry {
    /// Canonical short identifier, unique across the catalog (e.g. "COVER").
    pub code: String,
    /// Human-readable name; its normalized form doubles as the fuzzy-match
    /// prefix for free-text input.
    pub display_name: String,
    /// Payment-provider price reference. `None` marks a free service.
    #[serde(default)]
    pub price_ref: Option<String>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog must contain at least one entry")]
    Empty,

    #[error("catalog code may not be empty")]
    EmptyCode,

    #[error("catalog code {0:?} must be uppercase alphanumeric")]
    InvalidCode(String),

    #[error("duplicate catalog code: {0}")]
    DuplicateCode(String),

    #[error("catalog entry {code} has an empty display name")]
    EmptyDisplayName { code: String },

    #[error(
        "ambiguous catalog: display name {second:?} ({second_code}) overlaps {first:?} ({first_code})"
    )]
    AmbiguousDisplayName {
        first: String,
        first_code: String,
        second: String,
        second_code: String,
    },
}

/// Immutable code -> entry mapping plus the precomputed fuzzy-match rules.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
    // (normalized display name, code), ordered by code so the rule list is
    // deterministic regardless of configuration file ordering.
    fuzzy_rules: Vec<(String, String)>,
}

impl Catalog {
    /// Validate and index a set of entries.
    ///
    /// Fails if any code is empty/lowercase/duplicated, any display name is
    /// empty, or one normalized display name is a prefix of another (which
    /// would make fuzzy matching depend on rule order).
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Result<Self, CatalogError> {
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut map = BTreeMap::new();
        for entry in entries {
            if entry.code.is_empty() {
                return Err(CatalogError::EmptyCode);
            }
            if !entry
                .code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_lowercase())
            {
                return Err(CatalogError::InvalidCode(entry.code));
            }
            if normalize(&entry.display_name).is_empty() {
                return Err(CatalogError::EmptyDisplayName { code: entry.code });
            }
            if map.contains_key(&entry.code) {
                return Err(CatalogError::DuplicateCode(entry.code));
            }
            map.insert(entry.code.clone(), entry);
        }

        let fuzzy_rules: Vec<(String, String)> = map
            .values()
            .map(|entry| (normalize(&entry.display_name), entry.code.clone()))
            .collect();

        // Pairwise prefix check; the catalog is small so O(n^2) is fine.
        for (i, (name_a, code_a)) in fuzzy_rules.iter().enumerate() {
            for (name_b, code_b) in fuzzy_rules.iter().skip(i + 1) {
                if name_a.starts_with(name_b.as_str()) || name_b.starts_with(name_a.as_str()) {
                    return Err(CatalogError::AmbiguousDisplayName {
                        first: name_a.clone(),
                        first_code: code_a.clone(),
                        second: name_b.clone(),
                        second_code: code_b.clone(),
                    });
                }
            }
        }

        Ok(Self {
            entries: map,
            fuzzy_rules,
        })
    }

    /// Exact-code resolution: `upper` must already be uppercased by the caller.
    pub fn match_exact(&self, upper: &str) -> Option<ServiceCode> {
        self.entries
            .contains_key(upper)
            .then(|| ServiceCode(upper.to_string()))
    }

    /// Fuzzy resolution: does `normalized` start with a known display-name
    /// prefix? Rules are checked in code order; construction guarantees at
    /// most one can match.
    pub fn match_prefix(&self, normalized: &str) -> Option<ServiceCode> {
        self.fuzzy_rules
            .iter()
            .find(|(name, _)| normalized.starts_with(name.as_str()))
            .map(|(_, code)| ServiceCode(code.clone()))
    }

    pub fn get(&self, code: &ServiceCode) -> Option<&CatalogEntry> {
        self.entries.get(code.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in code order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }
}

/// Canonical form used on both sides of the fuzzy match: internal whitespace
/// runs collapsed to a single space, trimmed, lowercased.
pub fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
