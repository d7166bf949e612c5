//! Sentinel-marker classification of raw report pages

/// Shown on pages that were withdrawn or never published
pub const PULLED_MARKER: &[u8] = b"pulled for further review";
/// Additionally shown on pages still waiting for review
pub const NOT_REVIEWED_MARKER: &[u8] = b"not available for viewing";

/// What the raw bytes alone say about a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadClass {
    Withdrawn,
    NotReviewed,
    /// No marker: needs decoding and transformation
    Normal,
}

/// Final outcome for one harvested ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Withdrawn,
    NotReviewed,
    Hidden,
    Visible,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Withdrawn => "withdrawn",
            Self::NotReviewed => "not reviewed",
            Self::Hidden => "hidden",
            Self::Visible => "visible",
        };
        f.write_str(s)
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Classify on raw bytes; markers are ASCII so the source encoding doesn't matter.
pub fn classify_payload(raw: &[u8]) -> PayloadClass {
    if !contains(raw, PULLED_MARKER) {
        PayloadClass::Normal
    } else if contains(raw, NOT_REVIEWED_MARKER) {
        PayloadClass::NotReviewed
    } else {
        PayloadClass::Withdrawn
    }
}
