// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The severity scale.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;

use crate::Error;
use crate::ErrorKind;

/// The levels of the default scale, most severe first.
pub const DEFAULT_LEVELS: [(&str, i64, &str); 5] = [
    ("error", 0, "red"),
    ("warn", 1, "cyan"),
    ("trace", 2, "yellow"),
    ("info", 3, "green"),
    ("debug", 4, "blue"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct LevelDef {
    name: String,
    rank: i64,
    color: Option<String>,
}

/// An ordered, named set of severity levels.
///
/// A lower rank is more severe. A transport configured at threshold `t` observes every
/// severity `s` with `rank(s) <= rank(t)`.
///
/// # Examples
///
/// ```
/// use logdapter::level::Levels;
///
/// let levels = Levels::default();
/// assert_eq!(levels.rank("error"), Some(0));
/// assert_eq!(levels.passes("warn", "trace"), Some(true));
/// assert_eq!(levels.passes("debug", "trace"), Some(false));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Levels {
    // sorted by rank, ascending
    defs: Vec<LevelDef>,
    index: HashMap<String, usize>,
}

impl Default for Levels {
    fn default() -> Self {
        let levels = DEFAULT_LEVELS.iter().map(|(name, rank, _)| (*name, *rank));
        let colors = DEFAULT_LEVELS.iter().map(|(name, _, color)| (*name, *color));
        Levels::new(levels, colors).expect("the default scale is well-formed")
    }
}

impl Levels {
    /// Create a scale from `(name, rank)` pairs and `(name, color)` pairs.
    ///
    /// Colors for names that are not part of the scale are ignored.
    ///
    /// # Errors
    ///
    /// Return an [`ErrorKind::InvalidScale`] error if no level is given, or if a name or a rank
    /// appears more than once.
    pub fn new<N, C, V>(
        levels: impl IntoIterator<Item = (N, i64)>,
        colors: impl IntoIterator<Item = (C, V)>,
    ) -> Result<Levels, Error>
    where
        N: Into<String>,
        C: AsRef<str>,
        V: Into<String>,
    {
        let mut defs = Vec::new();
        let mut names = HashSet::new();
        let mut ranks = HashSet::new();
        for (name, rank) in levels {
            let name = name.into();
            if !names.insert(name.clone()) {
                return Err(Error::new(ErrorKind::InvalidScale, "duplicate level name")
                    .with_context("level", name));
            }
            if !ranks.insert(rank) {
                return Err(Error::new(ErrorKind::InvalidScale, "duplicate level rank")
                    .with_context("level", name)
                    .with_context("rank", rank));
            }
            defs.push(LevelDef {
                name,
                rank,
                color: None,
            });
        }

        if defs.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidScale,
                "a severity scale needs at least one level",
            ));
        }

        defs.sort_by_key(|def| def.rank);
        let index = defs
            .iter()
            .enumerate()
            .map(|(i, def)| (def.name.clone(), i))
            .collect::<HashMap<_, _>>();

        for (name, color) in colors {
            if let Some(&i) = index.get(name.as_ref()) {
                defs[i].color = Some(color.into());
            }
        }

        Ok(Levels { defs, index })
    }

    /// Return the rank of the named level.
    pub fn rank(&self, name: &str) -> Option<i64> {
        self.index.get(name).map(|&i| self.defs[i].rank)
    }

    /// Return the display color of the named level.
    pub fn color(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|severity| severity.color)
    }

    /// Whether the scale defines the named level.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Resolve the named level.
    pub fn get(&self, name: &str) -> Option<Severity<'_>> {
        self.index.get(name).map(|&i| self.severity_at(i))
    }

    /// Return all level names, most severe first.
    pub fn names(&self) -> impl ExactSizeIterator<Item = &str> {
        self.defs.iter().map(|def| def.name.as_str())
    }

    /// Return all levels, most severe first.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Severity<'_>> {
        (0..self.defs.len()).map(|i| self.severity_at(i))
    }

    /// The level with the lowest rank.
    pub fn most_severe(&self) -> Severity<'_> {
        self.severity_at(0)
    }

    /// The level with the highest rank.
    pub fn most_verbose(&self) -> Severity<'_> {
        self.severity_at(self.defs.len() - 1)
    }

    /// Whether a transport at `threshold` observes `severity`.
    ///
    /// Return `None` if either name is unknown.
    pub fn passes(&self, severity: &str, threshold: &str) -> Option<bool> {
        Some(self.get(severity)?.passes(self.get(threshold)?))
    }

    /// The name to rank mapping.
    pub fn ranks(&self) -> BTreeMap<String, i64> {
        self.defs
            .iter()
            .map(|def| (def.name.clone(), def.rank))
            .collect()
    }

    /// The name to color mapping; levels without a color are omitted.
    pub fn colors(&self) -> BTreeMap<String, String> {
        self.defs
            .iter()
            .filter_map(|def| Some((def.name.clone(), def.color.clone()?)))
            .collect()
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub(crate) fn severity_at(&self, i: usize) -> Severity<'_> {
        let def = &self.defs[i];
        Severity {
            name: &def.name,
            rank: def.rank,
            color: def.color.as_deref(),
        }
    }
}

/// A level resolved against its scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Severity<'a> {
    name: &'a str,
    rank: i64,
    color: Option<&'a str>,
}

impl<'a> Severity<'a> {
    /// The level name.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// The rank; lower is more severe.
    pub fn rank(&self) -> i64 {
        self.rank
    }

    /// The display color, if the scale has one.
    pub fn color(&self) -> Option<&'a str> {
        self.color
    }

    /// Whether this severity is observed by a transport at `threshold`.
    pub fn passes(&self, threshold: Severity<'_>) -> bool {
        self.rank <= threshold.rank
    }
}

impl fmt::Display for Severity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scale_order() {
        let levels = Levels::default();
        let names = levels.names().collect::<Vec<_>>();
        assert_eq!(names, vec!["error", "warn", "trace", "info", "debug"]);
        assert_eq!(levels.most_severe().name(), "error");
        assert_eq!(levels.most_verbose().name(), "debug");
        assert_eq!(levels.color("warn"), Some("cyan"));
    }

    #[test]
    fn test_passes_uses_rank_direction() {
        let levels = Levels::default();
        assert_eq!(levels.passes("error", "trace"), Some(true));
        assert_eq!(levels.passes("trace", "trace"), Some(true));
        assert_eq!(levels.passes("info", "trace"), Some(false));
        assert_eq!(levels.passes("nope", "trace"), None);
        assert_eq!(levels.passes("error", "nope"), None);
    }

    #[test]
    fn test_empty_scale_is_rejected() {
        let err = Levels::new(Vec::<(&str, i64)>::new(), Vec::<(&str, &str)>::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidScale);
    }

    #[test]
    fn test_duplicates_are_rejected() {
        let err = Levels::new([("a", 0), ("a", 1)], Vec::<(&str, &str)>::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidScale);

        let err = Levels::new([("a", 0), ("b", 0)], Vec::<(&str, &str)>::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidScale);
    }

    #[test]
    fn test_custom_scale_ignores_foreign_colors() {
        let levels = Levels::new([("loud", 10), ("quiet", 20)], [("loud", "red"), ("x", "blue")])
            .unwrap();
        assert_eq!(levels.color("loud"), Some("red"));
        assert_eq!(levels.color("quiet"), None);
        assert_eq!(levels.colors().len(), 1);
        assert_eq!(levels.ranks().get("quiet"), Some(&20));
    }
}
