//! Simulator backend selection.

use std::fmt;
use std::str::FromStr;

/// Environment variable that overrides `[backend] simulator`.
pub const SIM_ENV_VAR: &str = "SOCMAN_SIM_ENV";

/// The simulator backend that consumes the resolved unit lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Cadence Incisive (`ncvlog`, `ncelab`, `ncsim`).
    Incisive,
    /// Mentor Graphics ModelSim (`vlib`, `vlog`, `vsim`).
    Modelsim,
}

impl Backend {
    /// Every backend, in fallback order.
    pub const ALL: [Backend; 2] = [Backend::Incisive, Backend::Modelsim];

    /// The configuration spelling of this backend.
    pub fn name(self) -> &'static str {
        match self {
            Backend::Incisive => "incisive",
            Backend::Modelsim => "modelsim",
        }
    }

    /// Picks a backend from a raw configured value.
    ///
    /// An absent or unrecognized value logs a warning and falls back to the
    /// first member of [`Backend::ALL`].
    pub fn select(raw: Option<&str>) -> Backend {
        match raw.map(str::parse::<Backend>) {
            Some(Ok(backend)) => backend,
            _ => {
                let fallback = Backend::ALL[0];
                tracing::warn!(
                    "unexpected simulation environment {:?}, defaulting to {}",
                    raw.unwrap_or("<unset>"),
                    fallback
                );
                fallback
            }
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Backend::ALL
            .into_iter()
            .find(|b| b.name() == s.trim())
            .ok_or_else(|| format!("unknown backend '{s}'"))
    }
}
