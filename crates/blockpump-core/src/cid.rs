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

//! Content identifier reconstruction and comparison.
//!
//! Sources hand us blocks under keys, not identifiers. Depending on the source the
//! identifier is recovered in one of three ways:
//!
//! - the key's base segment is a full identifier string (`/bafy...`, `/Qm...`);
//! - the base segment is a bare multihash in block-key encoding, and the content codec is
//!   assumed ([`DEFAULT_BLOCK_CODEC`] for legacy repositories);
//! - the identifier is embedded at a fixed depth of a longer namespace path, as in the pin
//!   reverse index ([`PIN_INDEX_CID_DEPTH`]).
//!
//! Drains compare what they expect against what the destination computed with
//! [`CidPrefix::ensure_matches`].

use crate::error::{PumpError, PumpResult};
use crate::key::{self, Key};
use ::cid::multihash::Multihash;
use ::cid::{Cid, Version};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;

/// Multicodec for protobuf-encoded DAG nodes
pub const DAG_PB: u64 = 0x70;
/// Multicodec for raw bytes
pub const RAW: u64 = 0x55;
/// Multicodec for CBOR-encoded DAG nodes
pub const DAG_CBOR: u64 = 0x71;

/// Multihash code for SHA2-256
pub const SHA2_256: u64 = 0x12;
/// Multihash code for SHA2-512
pub const SHA2_512: u64 = 0x13;
/// Multihash code for BLAKE3
pub const BLAKE3: u64 = 0x1e;

/// Codec assumed for blocks stored under a bare multihash key
pub const DEFAULT_BLOCK_CODEC: u64 = DAG_PB;

/// Segment index of the identifier in `/pins/index/cidRindex/<cid>/<tag>`
pub const PIN_INDEX_CID_DEPTH: usize = 3;

/// Minimum segment count of a pin reverse-index key
pub const PIN_INDEX_MIN_SEGMENTS: usize = PIN_INDEX_CID_DEPTH + 1;

/// Human-readable multicodec name, as accepted by the node API
pub fn codec_name(codec: u64) -> Option<&'static str> {
    match codec {
        DAG_PB => Some("dag-pb"),
        RAW => Some("raw"),
        DAG_CBOR => Some("dag-cbor"),
        0x0129 => Some("dag-json"),
        _ => None,
    }
}

/// Human-readable multihash name, as accepted by the node API
pub fn hash_name(code: u64) -> Option<&'static str> {
    match code {
        SHA2_256 => Some("sha2-256"),
        SHA2_512 => Some("sha2-512"),
        BLAKE3 => Some("blake3"),
        _ => None,
    }
}

/// Identifier parameters: everything but the digest itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidPrefix {
    pub version: Version,
    pub codec: u64,
    pub mh_type: u64,
    pub mh_len: usize,
}

impl CidPrefix {
    /// Prefix of an existing identifier
    pub fn of(cid: &Cid) -> Self {
        CidPrefix {
            version: cid.version(),
            codec: cid.codec(),
            mh_type: cid.hash().code(),
            mh_len: cid.hash().size() as usize,
        }
    }

    /// CIDv1 prefix
    pub fn v1(codec: u64, mh_type: u64, mh_len: usize) -> Self {
        CidPrefix {
            version: Version::V1,
            codec,
            mh_type,
            mh_len,
        }
    }

    /// Hash `data` and build the identifier this prefix describes
    ///
    /// Digests longer than `mh_len` are truncated; a longer `mh_len` than the function
    /// produces is rejected.
    pub fn sum(&self, data: &[u8]) -> PumpResult<Cid> {
        let digest: Vec<u8> = match self.mh_type {
            SHA2_256 => Sha256::digest(data).to_vec(),
            SHA2_512 => Sha512::digest(data).to_vec(),
            BLAKE3 => blake3::hash(data).as_bytes().to_vec(),
            other => {
                return Err(PumpError::decode(format!(
                    "unsupported multihash function 0x{:x}",
                    other
                )))
            }
        };
        if self.mh_len == 0 || self.mh_len > digest.len() {
            return Err(PumpError::decode(format!(
                "invalid digest length {} for multihash 0x{:x}",
                self.mh_len, self.mh_type
            )));
        }

        let mh = Multihash::<64>::wrap(self.mh_type, &digest[..self.mh_len])
            .map_err(PumpError::decode)?;
        match self.version {
            Version::V0 => Cid::new_v0(mh).map_err(PumpError::decode),
            Version::V1 => Ok(Cid::new_v1(self.codec, mh)),
        }
    }

    /// Compare codec, multihash function and digest length
    ///
    /// The version is ignored: a v0 and a v1 identifier over the same dag-pb/sha2-256
    /// content address the same block.
    pub fn ensure_matches(&self, actual: &CidPrefix) -> PumpResult<()> {
        if self.codec != actual.codec {
            return Err(PumpError::integrity(
                "codec",
                describe(self.codec, codec_name),
                describe(actual.codec, codec_name),
            ));
        }
        if self.mh_type != actual.mh_type {
            return Err(PumpError::integrity(
                "multihash function",
                describe(self.mh_type, hash_name),
                describe(actual.mh_type, hash_name),
            ));
        }
        if self.mh_len != actual.mh_len {
            return Err(PumpError::integrity(
                "digest length",
                self.mh_len,
                actual.mh_len,
            ));
        }
        Ok(())
    }
}

impl fmt::Display for CidPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}/{}/{}/{}",
            self.version,
            describe(self.codec, codec_name),
            describe(self.mh_type, hash_name),
            self.mh_len
        )
    }
}

fn describe(code: u64, name: fn(u64) -> Option<&'static str>) -> String {
    name(code)
        .map(str::to_string)
        .unwrap_or_else(|| format!("0x{:x}", code))
}

/// Reconstruct the identifier of a block stored under a bare-digest key
///
/// The base segment is decoded to multihash bytes and wrapped in a CIDv1 with `codec`.
/// Keys that encode a whole identifier rather than a multihash decode to that identifier.
pub fn cid_from_key(key: &Key, codec: u64) -> PumpResult<Cid> {
    let bytes = key::to_binary(key)?;
    match Multihash::<64>::from_bytes(&bytes) {
        Ok(mh) => Ok(Cid::new_v1(codec, mh)),
        Err(mh_err) => Cid::try_from(bytes.as_slice()).map_err(|_| {
            PumpError::decode(format!(
                "key {} holds neither a multihash nor a CID: {}",
                key, mh_err
            ))
        }),
    }
}

/// Extract the identifier embedded in a pin reverse-index key
pub fn cid_from_pin_index_key(key: &Key) -> PumpResult<Cid> {
    let segments = key.segments();
    if segments.len() < PIN_INDEX_MIN_SEGMENTS {
        return Err(PumpError::decode(format!(
            "pin index key {} has {} segments, expected at least {}",
            key,
            segments.len(),
            PIN_INDEX_MIN_SEGMENTS
        )));
    }
    let encoded = segments[PIN_INDEX_CID_DEPTH];
    Cid::try_from(encoded)
        .map_err(|e| PumpError::decode(format!("invalid CID '{}' in key {}: {}", encoded, key, e)))
}

/// Identifier for a block key of any supported shape
///
/// Tries the block-key encoding first, then a CID string in the base segment.
pub fn resolve_cid(key: &Key, codec: u64) -> PumpResult<Cid> {
    match cid_from_key(key, codec) {
        Ok(cid) => Ok(cid),
        Err(err) => Cid::try_from(key.base_namespace()).map_err(|_| err),
    }
}

/// Block key for an identifier, in multihash-only form
pub fn key_from_cid(cid: &Cid) -> Key {
    key::from_binary(&cid.hash().to_bytes())
}
