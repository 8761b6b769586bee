// Blockpump - Block Migration for Content-Addressed Stores
// Copyright (C) 2026 Blockpump Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Hierarchical datastore keys.
//!
//! A [`Key`] is an ordered list of segments written `/seg1/seg2/...`. The last segment is
//! the base namespace; for block stores it carries the encoded digest.

use crate::error::{PumpError, PumpResult};
use multibase::Base;
use std::fmt;

/// Key prefix holding raw blocks in a node repository datastore
pub const BLOCKS_PREFIX: &str = "/blocks";

/// Key prefix of the pin reverse index in a node repository datastore
pub const PIN_INDEX_PREFIX: &str = "/pins/index/cidRindex";

/// Datastore key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    /// Clean a textual key: adds the leading `/` and drops empty segments
    pub fn new(raw: &str) -> Self {
        let normalized = blockpump_storage::normalize_key(raw);
        if normalized.is_empty() {
            Key("/".to_string())
        } else {
            Key(normalized)
        }
    }

    /// The root key `/`
    pub fn root() -> Self {
        Key("/".to_string())
    }

    /// Build a key from individual segments
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut raw = String::new();
        for segment in segments {
            raw.push('/');
            raw.push_str(segment.as_ref());
        }
        Key::new(&raw)
    }

    /// Textual form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ordered segments; empty for the root key
    pub fn segments(&self) -> Vec<&str> {
        self.0.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Segment at `index`, counting from the first
    pub fn segment(&self, index: usize) -> Option<&str> {
        self.0.split('/').filter(|s| !s.is_empty()).nth(index)
    }

    /// Last segment; empty for the root key
    pub fn base_namespace(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Key with `name` appended
    pub fn child(&self, name: &str) -> Key {
        if self.is_root() {
            Key::new(name)
        } else {
            Key::new(&format!("{}/{}", self.0, name))
        }
    }

    /// Key without its last segment; the root is its own parent
    pub fn parent(&self) -> Key {
        match self.0.rfind('/') {
            Some(0) | None => Key::root(),
            Some(idx) => Key(self.0[..idx].to_string()),
        }
    }

    /// True when `other` lives strictly below this key
    pub fn is_ancestor_of(&self, other: &Key) -> bool {
        if self.is_root() {
            return !other.is_root();
        }
        other
            .0
            .strip_prefix(&self.0)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(raw: &str) -> Self {
        Key::new(raw)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Block key for raw identifier bytes: `/` + unpadded upper-case base32
pub fn from_binary(bytes: &[u8]) -> Key {
    Key(format!("/{}", Base::Base32Upper.encode(bytes)))
}

/// Raw bytes encoded in the base namespace of a block key
pub fn to_binary(key: &Key) -> PumpResult<Vec<u8>> {
    let encoded = key.base_namespace();
    if encoded.is_empty() {
        return Err(PumpError::decode(format!("key {} has no base segment", key)));
    }
    Base::Base32Upper
        .decode(encoded)
        .map_err(|e| PumpError::decode(format!("key {} is not base32: {}", key, e)))
}
