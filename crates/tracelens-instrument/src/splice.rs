//! Application phase: splice collected probe texts into the source.

use crate::probes::Insertion;

/// Applies insertions bottom-up so earlier anchor offsets stay valid while
/// later ones are spliced. Anchors are unique (one merged insertion per
/// statement), so the sort order is total.
pub(crate) fn apply(source: &str, mut insertions: Vec<Insertion>) -> String {
    insertions.sort_by(|a, b| b.anchor_end.cmp(&a.anchor_end));
    let mut out = source.to_string();
    for insertion in insertions {
        out.insert_str(insertion.anchor_end, &insertion.text);
    }
    out
}
