//! Weighted filename scoring.
//!
//! Ranks candidate asset names against a requested platform profile.
//! Matching is case-insensitive and substring-based, except extensions
//! which compare through a small equivalence table (`.tgz` and `.tar.gz`
//! are the same format).

use std::collections::BTreeMap;

pub const WEIGHT_OS: i32 = 40;
pub const WEIGHT_ARCH: i32 = 30;
pub const WEIGHT_EXTENSION: i32 = 20;
pub const WEIGHT_TERM: i32 = 10;

/// Scores below this are "too low" for discovery to accept.
pub const SCORE_THRESHOLD: i32 = 40;

/// Self-updating distributions ship an `update` helper binary alongside the
/// real one; a large penalty keeps it from outranking the actual tool.
const UPDATE_PENALTY: i32 = -100;

#[derive(Debug, Clone, Default)]
pub struct ScoreOptions {
    pub os: Vec<String>,
    pub arch: Vec<String>,
    pub extensions: Vec<String>,
    pub terms: Vec<String>,
    pub names: Vec<String>,
    pub versions: Vec<String>,
    pub weighted_terms: BTreeMap<String, i32>,
    pub invalid_os: Vec<String>,
    pub invalid_arch: Vec<String>,
    pub invalid_extensions: Vec<String>,
}

/// A name and its computed score, produced in descending score order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scored {
    pub name: String,
    pub value: i32,
}

/// Score `names` against `opts`, descending by value; ties keep the input
/// order.
pub fn score(names: &[String], opts: &ScoreOptions) -> Vec<Scored> {
    let mut weights: BTreeMap<String, i32> = BTreeMap::new();
    weights.insert("update".into(), UPDATE_PENALTY);
    for token in &opts.os {
        weights.insert(token.to_lowercase(), WEIGHT_OS);
    }
    for token in &opts.arch {
        weights.insert(token.to_lowercase(), WEIGHT_ARCH);
    }
    for token in &opts.terms {
        weights.insert(token.to_lowercase(), WEIGHT_TERM);
    }
    for token in &opts.names {
        weights.insert(token.to_lowercase(), WEIGHT_TERM);
    }
    for token in &opts.versions {
        weights.insert(token.to_lowercase(), WEIGHT_TERM);
    }
    for (token, weight) in &opts.weighted_terms {
        weights.insert(token.to_lowercase(), *weight);
    }
    for token in &opts.invalid_os {
        weights.insert(token.to_lowercase(), -WEIGHT_OS);
    }
    for token in &opts.invalid_arch {
        weights.insert(token.to_lowercase(), -WEIGHT_ARCH);
    }

    let mut scored: Vec<Scored> = names
        .iter()
        .map(|name| {
            let lower = name.to_lowercase();
            let mut value = 0;

            for (token, weight) in &weights {
                if !token.is_empty() && lower.contains(token.as_str()) {
                    value += weight;
                }
            }

            if let Some(ext) = file_extension(&lower) {
                if opts
                    .extensions
                    .iter()
                    .any(|e| extensions_equivalent(&ext, e))
                {
                    value += WEIGHT_EXTENSION;
                }
                if opts
                    .invalid_extensions
                    .iter()
                    .any(|e| extensions_equivalent(&ext, e))
                {
                    value -= WEIGHT_EXTENSION;
                }
            }

            tracing::trace!(name = %name, score = value, "scored asset name");

            Scored {
                name: name.clone(),
                value,
            }
        })
        .collect();

    // Stable sort: equal scores keep their original listing order.
    scored.sort_by(|a, b| b.value.cmp(&a.value));
    scored
}

/// Trailing extension of a filename, honoring compound archive suffixes so
/// `foo.tar.gz` reports `tar.gz` rather than `gz`.
pub fn file_extension(name: &str) -> Option<String> {
    let lower = name.to_lowercase();
    for compound in ["tar.gz", "tar.xz", "tar.bz2"] {
        if lower.ends_with(&format!(".{compound}")) {
            return Some(compound.to_string());
        }
    }
    match lower.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_string()),
        _ => None,
    }
}

/// Compare two extensions through format equivalence; unknown extensions
/// compare literally.
pub fn extensions_equivalent(a: &str, b: &str) -> bool {
    canonical_extension(a) == canonical_extension(b)
}

fn canonical_extension(ext: &str) -> String {
    let ext = ext.trim_start_matches('.').to_lowercase();
    match ext.as_str() {
        "tgz" => "tar.gz".into(),
        "txz" => "tar.xz".into(),
        "tbz2" => "tar.bz2".into(),
        _ => ext,
    }
}
