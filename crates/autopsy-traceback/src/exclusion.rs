//! Exclusion lists for trace blocks and local lines

use serde::{Deserialize, Serialize};

/// Default markers for whole frames to drop: dependency sources installed by
/// cargo, the standard library, and the instrumentation wrapper itself
pub const DEFAULT_TRACES: &[&str] = &[".cargo/registry", ".cargo/git", "/rustc/", "autopsy_instrument"];

/// Default markers for single lines to drop: address-like values, raw type
/// renderings and dunder-named locals
pub const DEFAULT_LOCALS: &[&str] = &[" at 0x", " = 0x", "<class ", "TypeId(", "__"];

/// Ordered set of substrings used as a containment filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ExclusionList {
    markers: Vec<String>,
}

impl ExclusionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a marker; duplicates and empty markers are ignored
    pub fn insert(&mut self, marker: impl Into<String>) {
        let marker = marker.into();
        // An empty marker would match everything
        if !marker.is_empty() && !self.markers.contains(&marker) {
            self.markers.push(marker);
        }
    }

    pub fn with(mut self, marker: impl Into<String>) -> Self {
        self.insert(marker);
        self
    }

    /// Whether any marker occurs in `text`
    pub fn matches(&self, text: &str) -> bool {
        self.markers.iter().any(|marker| text.contains(marker.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.markers.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ExclusionList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = Self::new();
        for marker in iter {
            list.insert(marker);
        }
        list
    }
}

impl From<Vec<String>> for ExclusionList {
    fn from(markers: Vec<String>) -> Self {
        markers.into_iter().collect()
    }
}

impl From<ExclusionList> for Vec<String> {
    fn from(list: ExclusionList) -> Self {
        list.markers
    }
}

/// The two exclusion lists applied by the formatter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusions {
    /// Markers that drop a whole rendered block (a frame or summary line)
    pub traces: ExclusionList,
    /// Markers that drop a single output line
    pub locals: ExclusionList,
}

impl Exclusions {
    pub fn new(traces: ExclusionList, locals: ExclusionList) -> Self {
        Self { traces, locals }
    }

    /// No filtering at all
    pub fn none() -> Self {
        Self::new(ExclusionList::new(), ExclusionList::new())
    }
}

impl Default for Exclusions {
    fn default() -> Self {
        Self {
            traces: DEFAULT_TRACES.iter().copied().collect(),
            locals: DEFAULT_LOCALS.iter().copied().collect(),
        }
    }
}
