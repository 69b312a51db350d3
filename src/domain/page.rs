//! Page shape classification.

use serde::{Deserialize, Serialize};

/// The shape of one decoded snapshot, determined once per record by a
/// variant-specific classifier and then matched exhaustively. This
/// replaces scattering marker-substring probes across the extraction
/// functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageShape {
    /// Pre-submission state: expected values echo back as form inputs.
    SearchForm,
    /// Rendered result listing with label/value pairs.
    Results,
    /// Single-case detail page (accordion sections, case number block).
    Detail,
    /// The site reported no matches; extraction short-circuits, not an error.
    NoResults,
    /// Capture happened before the page finished rendering.
    Loading,
}

impl std::fmt::Display for PageShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::SearchForm => "search form",
            Self::Results => "results",
            Self::Detail => "detail",
            Self::NoResults => "no results",
            Self::Loading => "loading",
        };
        f.write_str(name)
    }
}
