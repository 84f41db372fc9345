//! View inheritance: merging a unit's views by priority into one view.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::attr::{KeySet, MergeMode};
use crate::view::View;

/// One entry of the active view list: a view name and how it merges.
///
/// Spelled `name` for override and `+name` for additive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSelector {
    /// The view name, without the `+` marker.
    pub name: String,
    /// How the view's declarations combine with earlier ones.
    pub mode: MergeMode,
}

impl ViewSelector {
    /// An override selector for `name`.
    pub fn over(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: MergeMode::Override,
        }
    }

    /// An additive selector for `name`.
    pub fn additive(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: MergeMode::Additive,
        }
    }

    /// Parses every entry of a view list.
    pub fn parse_list<S: AsRef<str>>(views: &[S]) -> Result<Vec<Self>, String> {
        views.iter().map(|v| v.as_ref().parse()).collect()
    }
}

impl FromStr for ViewSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, mode) = match s.strip_prefix('+') {
            Some(rest) => (rest.trim(), MergeMode::Additive),
            None => (s, MergeMode::Override),
        };
        if name.is_empty() {
            return Err(format!("empty view name in '{s}'"));
        }
        Ok(Self {
            name: name.to_string(),
            mode,
        })
    }
}

impl fmt::Display for ViewSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            MergeMode::Override => f.write_str(&self.name),
            MergeMode::Additive => write!(f, "+{}", self.name),
        }
    }
}

/// Merges `views` into `merged` following `selectors` in order.
///
/// Views a unit does not have are skipped. Only the keys in `keys` are
/// touched; with [`KeySet::All`] every key a view declares takes part.
pub fn apply_inheritance(
    views: &BTreeMap<String, View>,
    merged: &mut View,
    selectors: &[ViewSelector],
    keys: KeySet<'_>,
) {
    for selector in selectors {
        let Some(view) = views.get(&selector.name) else {
            continue;
        };
        for key in view.keys() {
            if let KeySet::Only(only) = keys {
                if !only.contains(&key) {
                    continue;
                }
            }
            if let Some(values) = view.get(key) {
                merged.merge(key, values, selector.mode);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::AttrKey;

    fn view(pairs: &[(AttrKey, &[&str])]) -> View {
        let mut v = View::new();
        for (key, values) in pairs {
            v.declare(*key, values.iter().map(|s| s.to_string()).collect());
        }
        v
    }

    fn views() -> BTreeMap<String, View> {
        let mut views = BTreeMap::new();
        views.insert(
            "default".to_string(),
            view(&[(AttrKey::Use, &["a"]), (AttrKey::SrcDir, &["rtl"])]),
        );
        views.insert("fpga".to_string(), view(&[(AttrKey::Use, &["b"])]));
        views
    }

    #[test]
    fn parse_selectors() {
        let sel: ViewSelector = " +fpga ".parse().unwrap();
        assert_eq!(sel, ViewSelector::additive("fpga"));
        assert_eq!(sel.to_string(), "+fpga");
        assert_eq!("default".parse::<ViewSelector>().unwrap(), ViewSelector::over("default"));
        assert!("+".parse::<ViewSelector>().is_err());
        assert!(ViewSelector::parse_list(&["default", ""]).is_err());
    }

    #[test]
    fn additive_appends() {
        let mut merged = View::new();
        let selectors = ViewSelector::parse_list(&["default", "+fpga"]).unwrap();
        apply_inheritance(&views(), &mut merged, &selectors, KeySet::All);
        assert_eq!(merged.get(AttrKey::Use).unwrap(), ["a".to_string(), "b".to_string()]);
        assert_eq!(merged.get(AttrKey::SrcDir).unwrap(), ["rtl".to_string()]);
    }

    #[test]
    fn override_replaces() {
        let mut merged = View::new();
        let selectors = ViewSelector::parse_list(&["default", "fpga"]).unwrap();
        apply_inheritance(&views(), &mut merged, &selectors, KeySet::All);
        assert_eq!(merged.get(AttrKey::Use).unwrap(), ["b".to_string()]);
        assert_eq!(merged.get(AttrKey::SrcDir).unwrap(), ["rtl".to_string()]);
    }

    #[test]
    fn missing_view_is_skipped() {
        let mut merged = View::new();
        let selectors = ViewSelector::parse_list(&["asic", "default"]).unwrap();
        apply_inheritance(&views(), &mut merged, &selectors, KeySet::All);
        assert_eq!(merged.get(AttrKey::Use).unwrap(), ["a".to_string()]);
    }

    #[test]
    fn restricted_keys() {
        let mut merged = View::new();
        let selectors = ViewSelector::parse_list(&["default"]).unwrap();
        apply_inheritance(
            &views(),
            &mut merged,
            &selectors,
            KeySet::Only(&AttrKey::DEPENDENCY_KEYS),
        );
        assert!(merged.is_declared(AttrKey::Use));
        assert!(!merged.is_declared(AttrKey::SrcDir));
    }

    #[test]
    fn additive_initializes_missing_key() {
        let mut merged = View::new();
        let selectors = ViewSelector::parse_list(&["+fpga"]).unwrap();
        apply_inheritance(&views(), &mut merged, &selectors, KeySet::All);
        assert_eq!(merged.get(AttrKey::Use).unwrap(), ["b".to_string()]);
    }
}
