//! The detach/reattach boundary between the configure and build phases.
//!
//! Nothing that holds a live filesystem location crosses the boundary as-is.
//! [`Detach::detach`] turns each entity into a plain record whose paths are
//! portable strings relative to the project root, and [`Detach::reattach`]
//! rebuilds the entity against the root of the phase that reads it.
//!
//! A snapshot on disk is laid out as:
//!
//! ```text
//! [u32 LE header length][bincode SnapshotHeader][bincode payload]
//! ```
//!
//! The header carries magic bytes, the format version and an XXH3 checksum
//! of the payload; all three are validated before the payload is decoded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use socman_common::ContentHash;

use crate::context::ProjectContext;
use crate::error::SnapshotError;
use crate::inherit::ViewSelector;
use crate::unit::{ExtValue, ResolvedAttrs, Unit};
use crate::view::View;

/// Magic bytes identifying a unit registry snapshot.
const SNAPSHOT_MAGIC: [u8; 4] = *b"SOCM";

/// Current snapshot format version. Increment on breaking changes to the
/// header or any record.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Conversion to and from a phase-independent record.
pub trait Detach: Sized {
    /// The portable form of `Self`.
    type Record;

    /// Strips live paths, replacing them with root-relative strings.
    fn detach(&self, ctx: &ProjectContext) -> Self::Record;

    /// Rebuilds `Self` from its record against `ctx`.
    fn reattach(record: Self::Record, ctx: &ProjectContext) -> Self;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotHeader {
    magic: [u8; 4],
    format_version: u32,
    checksum: ContentHash,
}

/// An opaque, serialized, detached unit registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    bytes: Vec<u8>,
}

impl Snapshot {
    /// Wraps raw snapshot bytes. Validation happens on unpack.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the snapshot, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Writes the snapshot to `path`, creating parent directories.
    pub fn write_to(&self, path: &Path) -> Result<(), SnapshotError> {
        let io_err = |source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, &self.bytes).map_err(io_err)
    }

    /// Reads a snapshot previously written with [`write_to`](Self::write_to).
    pub fn read_from(path: &Path) -> Result<Self, SnapshotError> {
        let bytes = std::fs::read(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { bytes })
    }

    pub(crate) fn encode<T: Serialize>(record: &T) -> Result<Self, SnapshotError> {
        let payload = bincode::serde::encode_to_vec(record, bincode::config::standard())
            .map_err(|e| SnapshotError::Serialization {
                reason: e.to_string(),
            })?;

        let header = SnapshotHeader {
            magic: SNAPSHOT_MAGIC,
            format_version: SNAPSHOT_FORMAT_VERSION,
            checksum: ContentHash::from_bytes(&payload),
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| SnapshotError::Serialization {
                reason: e.to_string(),
            })?;

        let header_len = header_bytes.len() as u32;
        let mut bytes = Vec::with_capacity(4 + header_bytes.len() + payload.len());
        bytes.extend_from_slice(&header_len.to_le_bytes());
        bytes.extend_from_slice(&header_bytes);
        bytes.extend_from_slice(&payload);
        Ok(Self { bytes })
    }

    pub(crate) fn decode<T: DeserializeOwned>(&self) -> Result<T, SnapshotError> {
        let raw = &self.bytes;
        let len_bytes: [u8; 4] = raw
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| SnapshotError::InvalidHeader {
                reason: "snapshot is shorter than its length prefix".to_string(),
            })?;
        let header_len = u32::from_le_bytes(len_bytes) as usize;
        let header_bytes =
            raw.get(4..4 + header_len)
                .ok_or_else(|| SnapshotError::InvalidHeader {
                    reason: format!("header length {header_len} exceeds snapshot size"),
                })?;

        let (header, _): (SnapshotHeader, usize) =
            bincode::serde::decode_from_slice(header_bytes, bincode::config::standard()).map_err(
                |e| SnapshotError::InvalidHeader {
                    reason: e.to_string(),
                },
            )?;

        if header.magic != SNAPSHOT_MAGIC {
            return Err(SnapshotError::InvalidHeader {
                reason: format!("bad magic {:?}", header.magic),
            });
        }
        if header.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::VersionMismatch {
                expected: SNAPSHOT_FORMAT_VERSION,
                actual: header.format_version,
            });
        }

        let payload = &raw[4 + header_len..];
        let actual = ContentHash::from_bytes(payload);
        if actual != header.checksum {
            return Err(SnapshotError::ChecksumMismatch {
                expected: header.checksum.to_string(),
                actual: actual.to_string(),
            });
        }

        let (record, _) = bincode::serde::decode_from_slice(payload, bincode::config::standard())
            .map_err(|e| SnapshotError::Serialization {
                reason: e.to_string(),
            })?;
        Ok(record)
    }
}

/// Portable form of [`ExtValue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtRecord {
    /// Free text.
    Text(String),
    /// A list of strings.
    List(Vec<String>),
    /// A root-relative or absolute path string.
    Path(String),
}

impl Detach for ExtValue {
    type Record = ExtRecord;

    fn detach(&self, ctx: &ProjectContext) -> ExtRecord {
        match self {
            ExtValue::Text(t) => ExtRecord::Text(t.clone()),
            ExtValue::List(l) => ExtRecord::List(l.clone()),
            ExtValue::Path(p) => ExtRecord::Path(ctx.detach_path(p)),
        }
    }

    fn reattach(record: ExtRecord, ctx: &ProjectContext) -> Self {
        match record {
            ExtRecord::Text(t) => ExtValue::Text(t),
            ExtRecord::List(l) => ExtValue::List(l),
            ExtRecord::Path(p) => ExtValue::Path(ctx.attach_path(&p)),
        }
    }
}

/// Portable form of [`ResolvedAttrs`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrsRecord {
    name: String,
    unit_top: String,
    tb: String,
    uses: Vec<String>,
    tb_uses: Vec<String>,
    src_dirs: Vec<String>,
    src: Vec<String>,
    includes: Vec<String>,
    tb_dirs: Vec<String>,
    tb_src: Vec<String>,
    tb_includes: Vec<String>,
}

fn detach_set<'a>(
    paths: impl IntoIterator<Item = &'a PathBuf>,
    ctx: &ProjectContext,
) -> Vec<String> {
    paths.into_iter().map(|p| ctx.detach_path(p)).collect()
}

fn attach_set<C: FromIterator<PathBuf>>(paths: Vec<String>, ctx: &ProjectContext) -> C {
    paths.iter().map(|p| ctx.attach_path(p)).collect()
}

impl Detach for ResolvedAttrs {
    type Record = AttrsRecord;

    fn detach(&self, ctx: &ProjectContext) -> AttrsRecord {
        AttrsRecord {
            name: self.name.clone(),
            unit_top: self.unit_top.clone(),
            tb: self.tb.clone(),
            uses: self.uses.clone(),
            tb_uses: self.tb_uses.clone(),
            src_dirs: detach_set(&self.src_dirs, ctx),
            src: detach_set(&self.src, ctx),
            includes: detach_set(&self.includes, ctx),
            tb_dirs: detach_set(&self.tb_dirs, ctx),
            tb_src: detach_set(&self.tb_src, ctx),
            tb_includes: detach_set(&self.tb_includes, ctx),
        }
    }

    fn reattach(record: AttrsRecord, ctx: &ProjectContext) -> Self {
        ResolvedAttrs {
            name: record.name,
            unit_top: record.unit_top,
            tb: record.tb,
            uses: record.uses,
            tb_uses: record.tb_uses,
            src_dirs: attach_set(record.src_dirs, ctx),
            src: attach_set(record.src, ctx),
            includes: attach_set(record.includes, ctx),
            tb_dirs: attach_set(record.tb_dirs, ctx),
            tb_src: attach_set(record.tb_src, ctx),
            tb_includes: attach_set(record.tb_includes, ctx),
        }
    }
}

/// Portable form of [`Unit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub(crate) name: String,
    script: String,
    views: BTreeMap<String, View>,
    merged: View,
    attrs: Option<AttrsRecord>,
    pub(crate) synth_deps: Vec<String>,
    pub(crate) sim_deps: Vec<String>,
    checked: bool,
    ext: BTreeMap<String, ExtRecord>,
}

impl Detach for Unit {
    type Record = UnitRecord;

    fn detach(&self, ctx: &ProjectContext) -> UnitRecord {
        UnitRecord {
            name: self.name.clone(),
            script: ctx.detach_path(&self.script),
            views: self.views.clone(),
            merged: self.merged.clone(),
            attrs: self.attrs.as_ref().map(|a| a.detach(ctx)),
            synth_deps: self.synth_deps.clone(),
            sim_deps: self.sim_deps.clone(),
            checked: self.checked,
            ext: self
                .ext
                .iter()
                .map(|(k, v)| (k.clone(), v.detach(ctx)))
                .collect(),
        }
    }

    fn reattach(record: UnitRecord, ctx: &ProjectContext) -> Self {
        Unit {
            name: record.name,
            script: ctx.attach_path(&record.script),
            views: record.views,
            merged: record.merged,
            attrs: record.attrs.map(|a| ResolvedAttrs::reattach(a, ctx)),
            synth_deps: record.synth_deps,
            sim_deps: record.sim_deps,
            checked: record.checked,
            ext: record
                .ext
                .into_iter()
                .map(|(k, v)| (k, ExtValue::reattach(v, ctx)))
                .collect(),
        }
    }
}

/// Portable form of [`UnitRegistry`](crate::UnitRegistry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub(crate) units: Vec<UnitRecord>,
    pub(crate) views: Vec<ViewSelector>,
    pub(crate) top_level: Option<String>,
    pub(crate) synth_deps: Vec<String>,
    pub(crate) sim_deps: Vec<String>,
    pub(crate) checked: bool,
}

impl RegistryRecord {
    /// Ensures every dependency name refers to a unit in the record.
    pub(crate) fn validate(&self) -> Result<(), SnapshotError> {
        let known = |name: &str| self.units.iter().any(|u| u.name == name);
        let dangling = |holder: &str, names: &[String]| {
            names
                .iter()
                .find(|n| !known(n.as_str()))
                .map(|n| SnapshotError::DanglingReference {
                    unit: holder.to_string(),
                    missing: n.clone(),
                })
        };

        if let Some(top) = &self.top_level {
            if !known(top) {
                return Err(SnapshotError::DanglingReference {
                    unit: "<registry>".to_string(),
                    missing: top.clone(),
                });
            }
        }
        for names in [&self.synth_deps, &self.sim_deps] {
            if let Some(err) = dangling("<registry>", names.as_slice()) {
                return Err(err);
            }
        }
        for unit in &self.units {
            for names in [&unit.synth_deps, &unit.sim_deps] {
                if let Some(err) = dangling(&unit.name, names.as_slice()) {
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}
