//! Configuration types deserialized from `socman.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use socman_common::{to_list, HdlExtensions};

/// The top-level project configuration parsed from `socman.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Core project settings (name, top level, views, build directory).
    pub project: ProjectMeta,
    /// Simulator backend selection.
    #[serde(default)]
    pub backend: BackendConfig,
    /// HDL file-extension tables.
    #[serde(default)]
    pub hdl: HdlExtensions,
    /// Include-dependency scanner settings.
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Core project settings.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// Root unit of the design. May instead be given on the command line.
    #[serde(default)]
    pub top_level: Option<String>,
    /// Ordered view priority list; `+name` entries are additive.
    #[serde(default = "default_views", deserialize_with = "deserialize_string_or_vec")]
    pub views: Vec<String>,
    /// Check every view of every unit before resolving the top level.
    #[serde(default)]
    pub check: bool,
    /// Build directory, relative to the project root.
    #[serde(default = "default_build_dir")]
    pub build_dir: String,
}

fn default_views() -> Vec<String> {
    vec!["default".to_string()]
}

fn default_build_dir() -> String {
    "build".to_string()
}

/// Simulator backend selection.
#[derive(Debug, Default, Deserialize)]
pub struct BackendConfig {
    /// Simulator name; validated and defaulted by [`Backend::select`](crate::Backend::select).
    #[serde(default)]
    pub simulator: Option<String>,
}

/// Settings for the external preprocessor used to discover included files.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Preprocessor program name or path.
    pub preprocessor: String,
    /// Flag placed before every include directory.
    pub include_flag: String,
    /// Extra arguments placed before the include directories.
    pub args: Vec<String>,
    /// Environment variables whose values take part in the scan-cache key.
    pub env: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            preprocessor: "vppreproc".to_string(),
            include_flag: "-y".to_string(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }
}

/// A list of strings that may be written either as a TOML array or as a
/// single comma-separated string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringList(pub Vec<String>);

impl<'de> Deserialize<'de> for StringList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_string_or_vec(deserializer).map(StringList)
    }
}

/// Deserializes a field that can be either a comma-separated string or a
/// list of strings.
///
/// `use = "fifo, uart"` and `use = ["fifo", "uart"]` produce the same value.
/// Array entries are taken verbatim.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(to_list(v))
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn views_as_comma_string() {
        let toml = r#"
[project]
name = "soc"
views = "default, +debug"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.views, vec!["default", "+debug"]);
    }

    #[test]
    fn views_as_list() {
        let toml = r#"
[project]
name = "soc"
views = ["default", "+debug"]
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.views, vec!["default", "+debug"]);
    }

    #[test]
    fn hdl_tables_override() {
        let toml = r#"
[project]
name = "soc"

[hdl]
verilog = [".v", ".vh"]
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.hdl.verilog, vec![".v", ".vh"]);
        assert_eq!(config.hdl.vhdl, vec![".vhdl", ".vhd"]);
    }

    #[test]
    fn scan_defaults() {
        let toml = r#"
[project]
name = "soc"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.scan.preprocessor, "vppreproc");
        assert_eq!(config.scan.include_flag, "-y");
        assert!(config.scan.args.is_empty());
        assert!(config.scan.env.is_empty());
    }

    #[test]
    fn scan_overrides() {
        let toml = r#"
[project]
name = "soc"

[scan]
preprocessor = "/opt/veripool/bin/vppreproc"
args = ["--noline"]
env = ["VERILATOR_ROOT"]
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.scan.preprocessor, "/opt/veripool/bin/vppreproc");
        assert_eq!(config.scan.include_flag, "-y");
        assert_eq!(config.scan.args, vec!["--noline"]);
        assert_eq!(config.scan.env, vec!["VERILATOR_ROOT"]);
    }

    #[test]
    fn string_list_from_string() {
        #[derive(Deserialize)]
        struct Holder {
            v: StringList,
        }
        let h: Holder = toml::from_str(r#"v = "a,b""#).unwrap();
        assert_eq!(h.v, StringList(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn string_list_rejects_numbers() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Holder {
            v: StringList,
        }
        assert!(toml::from_str::<Holder>("v = 3").is_err());
    }
}
