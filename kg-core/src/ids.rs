//! Stable identifier derivation.
//!
//! `concept_id` must be stable and derived from the concept's label so that
//! two extractions of the same label (even across ontologies) land on the
//! same candidate id before vector matching ever runs (§3, invariant 4).
//! `source_id` is `{filename}_chunk{N}`. `instance_id` is opaque.

use uuid::Uuid;

/// Derive a stable, kebab-cased concept id from a label.
///
/// Lowercases, replaces runs of non-alphanumeric characters with a single
/// `-`, and trims leading/trailing `-`. Empty input (or input that is
/// entirely punctuation) falls back to a random suffix so the id is still
/// unique, since an empty slug would collide across every such concept.
#[must_use]
pub fn concept_id_from_label(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut last_was_sep = true; // avoid leading '-'
    for ch in label.chars() {
        if ch.is_alphanumeric() {
            for lc in ch.to_lowercase() {
                slug.push(lc);
            }
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('-');
            last_was_sep = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug = format!("concept-{}", Uuid::new_v4().simple());
    }
    slug
}

/// Build a `source_id` for the `n`th chunk (0-indexed) of `filename`.
#[must_use]
pub fn source_id(filename: &str, chunk_index: usize) -> String {
    format!("{filename}_chunk{chunk_index}")
}

/// Generate a fresh, opaque `instance_id`.
#[must_use]
pub fn new_instance_id() -> String {
    format!("inst_{}", Uuid::new_v4().simple())
}

/// Generate a fresh job id.
#[must_use]
pub fn new_job_id() -> String {
    format!("job_{}", Uuid::new_v4().simple())
}
