//! Block description cleaning for geocoding.
//!
//! The county reports locations in a few shapes:
//! - Block addresses: `"100 Block Main St"`
//! - Plain streets: `"Parham Rd"`
//! - Intersections: `"Main St / Oak Ave"`, sometimes with a block number
//!   in front (`"100 Block Main St / Oak Ave"`)
//!
//! Nominatim rejects the `Block` marker and cannot resolve true
//! intersections, so this module reduces the text to a single-street
//! query and remembers whether it was an intersection.

use regex::Regex;
use std::sync::LazyLock;

/// Regex for the `BLOCK` / `BLOCK OF` / `BLK` marker anywhere in the text.
static BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:BLOCK\s+OF|BLOCK|BLK)\b").expect("valid regex"));

/// Regex for a leading house/block number.
static LEADING_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s+").expect("valid regex"));

/// Separators between the two roads of an intersection.
const INTERSECTION_SEPARATORS: &[&str] = &["/", " & "];

/// Result of cleaning a block description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanedBlock {
    /// A single street suitable for geocoding.
    Street(String),
    /// Two crossing roads.
    Intersection {
        /// First road, which is what single-street lookups query.
        street1: String,
        /// Second road.
        street2: String,
    },
    /// Nothing geocodable remains.
    NotGeocodable,
}

impl CleanedBlock {
    /// Returns the single-street query to send to a street-level lookup.
    ///
    /// Intersections are approximated by their first road.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        match self {
            Self::Street(street) | Self::Intersection { street1: street, .. } => Some(street),
            Self::NotGeocodable => None,
        }
    }

    /// Whether the description named two crossing roads.
    #[must_use]
    pub const fn is_intersection(&self) -> bool {
        matches!(self, Self::Intersection { .. })
    }
}

/// Cleans a block description for geocoding.
///
/// ```
/// use hpd_alerts_geocoder::address::{CleanedBlock, clean_block};
///
/// assert_eq!(
///     clean_block("100 Block Main St / Oak Ave"),
///     CleanedBlock::Intersection {
///         street1: "Main St".to_string(),
///         street2: "Oak Ave".to_string(),
///     }
/// );
/// ```
#[must_use]
pub fn clean_block(raw: &str) -> CleanedBlock {
    let raw = raw.trim();
    if raw.is_empty() {
        return CleanedBlock::NotGeocodable;
    }

    for sep in INTERSECTION_SEPARATORS {
        if let Some((left, right)) = raw.split_once(sep) {
            // A block number locates a span of one road, not a crossing.
            let street1 = strip_leading_number(&clean_street(left));
            let street2 = strip_leading_number(&clean_street(right));
            if !street1.is_empty() && !street2.is_empty() {
                return CleanedBlock::Intersection { street1, street2 };
            }
            let remaining = if street1.is_empty() { street2 } else { street1 };
            return street_or_nothing(remaining);
        }
    }

    street_or_nothing(clean_street(raw))
}

fn street_or_nothing(street: String) -> CleanedBlock {
    if street.is_empty() {
        CleanedBlock::NotGeocodable
    } else {
        CleanedBlock::Street(street)
    }
}

/// Removes the block marker and collapses whitespace.
fn clean_street(text: &str) -> String {
    let without_block = BLOCK_RE.replace_all(text, " ");
    without_block.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_leading_number(street: &str) -> String {
    LEADING_NUMBER_RE.replace(street, "").trim().to_string()
}
