//! Context assembly for answer prompts.

use crate::vector_index::SearchHit;

/// Join retrieved texts, nearest first, one per line. Distances are dropped.
pub fn build_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| hit.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
