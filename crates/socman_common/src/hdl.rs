//! HDL languages and the file-extension tables used to discover sources.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// HDL language recognised from a file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HdlLanguage {
    /// Verilog-2005.
    Verilog,
    /// SystemVerilog.
    SystemVerilog,
    /// VHDL.
    Vhdl,
}

/// Extension tables for each HDL language, plus timing-constraint files.
///
/// Extensions include the leading dot (`".v"`) and are matched as file-name
/// suffixes, the same way a `**/*.v` glob would.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HdlExtensions {
    /// Extensions compiled as Verilog.
    pub verilog: Vec<String>,
    /// Extensions compiled as SystemVerilog.
    pub systemverilog: Vec<String>,
    /// Extensions compiled as VHDL.
    pub vhdl: Vec<String>,
    /// Extensions identifying Synopsys Design Constraints files.
    pub sdc: Vec<String>,
}

impl Default for HdlExtensions {
    fn default() -> Self {
        Self {
            verilog: vec![".v".to_string()],
            systemverilog: vec![".sv".to_string()],
            vhdl: vec![".vhdl".to_string(), ".vhd".to_string()],
            sdc: vec![".sdc".to_string()],
        }
    }
}

impl HdlExtensions {
    /// All extensions that identify HDL source files (Verilog, SystemVerilog, VHDL).
    pub fn source_extensions(&self) -> Vec<&str> {
        self.verilog
            .iter()
            .chain(&self.systemverilog)
            .chain(&self.vhdl)
            .map(String::as_str)
            .collect()
    }

    /// Detects the HDL language of a path from its file name.
    ///
    /// Returns `None` for anything that is not an HDL source.
    pub fn detect(&self, path: &Path) -> Option<HdlLanguage> {
        let name = path.file_name()?.to_str()?;
        let matches = |exts: &[String]| exts.iter().any(|e| name.ends_with(e.as_str()));
        if matches(&self.verilog) {
            Some(HdlLanguage::Verilog)
        } else if matches(&self.systemverilog) {
            Some(HdlLanguage::SystemVerilog)
        } else if matches(&self.vhdl) {
            Some(HdlLanguage::Vhdl)
        } else {
            None
        }
    }

    /// Returns `true` if the path names an HDL source file.
    pub fn is_source(&self, path: &Path) -> bool {
        self.detect(path).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables() {
        let ext = HdlExtensions::default();
        assert_eq!(ext.source_extensions(), vec![".v", ".sv", ".vhdl", ".vhd"]);
        assert_eq!(ext.sdc, vec![".sdc"]);
    }

    #[test]
    fn detect_languages() {
        let ext = HdlExtensions::default();
        assert_eq!(ext.detect(Path::new("rtl/top.v")), Some(HdlLanguage::Verilog));
        assert_eq!(
            ext.detect(Path::new("rtl/pkg.sv")),
            Some(HdlLanguage::SystemVerilog)
        );
        assert_eq!(ext.detect(Path::new("alu.vhd")), Some(HdlLanguage::Vhdl));
        assert_eq!(ext.detect(Path::new("alu.vhdl")), Some(HdlLanguage::Vhdl));
    }

    #[test]
    fn non_sources_rejected() {
        let ext = HdlExtensions::default();
        assert!(!ext.is_source(Path::new("timing.sdc")));
        assert!(!ext.is_source(Path::new("README.md")));
        assert!(!ext.is_source(Path::new("defs.vh")));
    }

    #[test]
    fn custom_table() {
        let ext = HdlExtensions {
            verilog: vec![".v".to_string(), ".vh".to_string()],
            ..HdlExtensions::default()
        };
        assert_eq!(ext.detect(Path::new("defs.vh")), Some(HdlLanguage::Verilog));
    }
}
