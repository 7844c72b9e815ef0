//! Lineage signatures.
//!
//! Every operator has a canonical recursive description: its tag and
//! literal parameters followed by the descriptions of its input producers,
//! joined by `%`. The MD5 hex digest of that string is the operator's
//! *lineage signature* - the identity used by the Markov model and the
//! materialization cache. Structural copies of a sub-plan therefore share
//! signatures, while any change to a literal parameter (file path,
//! predicate, constant, input mtime) produces a fresh one.

use md5::{Digest, Md5};

/// MD5 hex digest of a canonical lineage string.
pub fn signature(lineage: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(lineage.as_bytes());
    format!("{:x}", hasher.finalize())
}
