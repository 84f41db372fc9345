//! The closed set of recognized view attributes and how views combine them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AttrError;

/// A recognized view attribute.
///
/// Each key has a fixed default-derivation rule, applied when a view does
/// not declare it (see [`View::resolve`](crate::View::resolve)).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttrKey {
    /// Library/display name override; defaults to the unit name.
    Name,
    /// Name of the HDL top module inside the unit; defaults to the unit name.
    UnitTop,
    /// Synthesis dependency edges.
    Use,
    /// Testbench dependency edges.
    TbUse,
    /// Source directories; defaults to `src`.
    SrcDir,
    /// Explicit source files; defaults to a search of the source directories.
    Src,
    /// Include directories; defaults to the source directories.
    Includes,
    /// Testbench directories; defaults to `tb`.
    TbDir,
    /// Explicit testbench files; defaults to a search of the testbench directories.
    TbSrc,
    /// Testbench include directories; defaults to source and testbench directories.
    TbIncludes,
    /// Testbench module name; defaults to `tb_<unit>`.
    Tb,
}

impl AttrKey {
    /// Every recognized key.
    pub const ALL: [AttrKey; 11] = [
        AttrKey::Name,
        AttrKey::UnitTop,
        AttrKey::Use,
        AttrKey::SrcDir,
        AttrKey::Src,
        AttrKey::Includes,
        AttrKey::TbDir,
        AttrKey::TbSrc,
        AttrKey::TbIncludes,
        AttrKey::Tb,
        AttrKey::TbUse,
    ];

    /// The keys that carry dependency edges, merged before the graph exists.
    pub const DEPENDENCY_KEYS: [AttrKey; 2] = [AttrKey::Use, AttrKey::TbUse];

    /// The declaration spelling of this key.
    pub fn as_str(self) -> &'static str {
        match self {
            AttrKey::Name => "name",
            AttrKey::UnitTop => "unit_top",
            AttrKey::Use => "use",
            AttrKey::TbUse => "tb_use",
            AttrKey::SrcDir => "src_dir",
            AttrKey::Src => "src",
            AttrKey::Includes => "includes",
            AttrKey::TbDir => "tb_dir",
            AttrKey::TbSrc => "tb_src",
            AttrKey::TbIncludes => "tb_includes",
            AttrKey::Tb => "tb",
        }
    }

    /// Whether the key holds exactly one value once resolved.
    pub fn is_scalar(self) -> bool {
        matches!(self, AttrKey::Name | AttrKey::UnitTop | AttrKey::Tb)
    }

    /// Whether the key names files or directories (as opposed to units or modules).
    pub fn is_path(self) -> bool {
        matches!(
            self,
            AttrKey::SrcDir
                | AttrKey::Src
                | AttrKey::Includes
                | AttrKey::TbDir
                | AttrKey::TbSrc
                | AttrKey::TbIncludes
        )
    }
}

impl fmt::Display for AttrKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttrKey {
    type Err = AttrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttrKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| AttrError::Unrecognized(s.to_string()))
    }
}

/// How a view's declared values combine with what is already resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeMode {
    /// Declared values replace the resolved value.
    Override,
    /// Declared values are appended to the resolved value.
    Additive,
}

/// Which attribute keys an inheritance pass considers.
#[derive(Clone, Copy, Debug)]
pub enum KeySet<'a> {
    /// Every key a view declares.
    All,
    /// Only the listed keys.
    Only(&'a [AttrKey]),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spelling_roundtrip() {
        for key in AttrKey::ALL {
            assert_eq!(key.as_str().parse::<AttrKey>().unwrap(), key);
        }
    }

    #[test]
    fn unrecognized_key() {
        let err = "sources".parse::<AttrKey>().unwrap_err();
        assert!(matches!(err, AttrError::Unrecognized(ref k) if k == "sources"));
    }

    #[test]
    fn internal_spellings_are_not_keys() {
        assert!("_includes".parse::<AttrKey>().is_err());
        assert!("Use".parse::<AttrKey>().is_err());
    }

    #[test]
    fn scalar_and_path_keys() {
        assert!(AttrKey::Tb.is_scalar());
        assert!(!AttrKey::Use.is_scalar());
        assert!(AttrKey::TbIncludes.is_path());
        assert!(!AttrKey::TbUse.is_path());
    }
}
