//! Fingerprint based change detection.
//!
//! # Responsibilities
//! - Remember the last fingerprint observed per configuration key
//! - Report whether a freshly fetched fingerprint is new
//!
//! # Design Decisions
//! - The map is owned by an explicit detector value, not a global; each
//!   config source holds its own and tests build isolated ones
//! - Concurrent first loads of one key may both report `is_first_load`;
//!   the client manager lock is what prevents duplicate rebuilds

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Outcome of comparing a fingerprint with the last one seen for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeStatus {
    pub is_changed: bool,
    pub is_first_load: bool,
}

/// Last-seen fingerprint per configuration key.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    fingerprints: Arc<DashMap<String, String>>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare and record. A first load counts as a change.
    pub fn detect_change(&self, key: &str, fingerprint: &str) -> ChangeStatus {
        match self.fingerprints.entry(key.to_string()) {
            Entry::Vacant(entry) => {
                entry.insert(fingerprint.to_string());
                ChangeStatus { is_changed: true, is_first_load: true }
            }
            Entry::Occupied(mut entry) => {
                if entry.get() == fingerprint {
                    ChangeStatus { is_changed: false, is_first_load: false }
                } else {
                    entry.insert(fingerprint.to_string());
                    ChangeStatus { is_changed: true, is_first_load: false }
                }
            }
        }
    }

    /// Last fingerprint recorded for `key`.
    pub fn last_fingerprint(&self, key: &str) -> Option<String> {
        self.fingerprints.get(key).map(|fp| fp.value().clone())
    }
}
