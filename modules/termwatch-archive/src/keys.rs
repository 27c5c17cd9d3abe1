use sha2::{Digest, Sha256};
use termwatch_common::RunStamp;

/// Object key for the archive unit of `term` in the run at `stamp`:
/// `{prefix}{stamp}_{term}.jsonl`, spaces in the stamp and every non-alphanumeric
/// character in the term replaced with `_`.
///
/// Two different terms can normalize to the same text ("rust lang" and "rust-lang").
/// When normalization changed the term, eight hex chars of its SHA-256 are appended
/// so those keys stay distinct within a run.
pub fn archive_key(prefix: &str, stamp: &RunStamp, term: &str) -> String {
    let stamp_part = stamp.as_str().replace(' ', "_");
    let term_part: String = term
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    if term_part == term {
        format!("{prefix}{stamp_part}_{term_part}.jsonl")
    } else {
        let digest = Sha256::digest(term.as_bytes());
        let suffix = &hex::encode(digest)[..8];
        format!("{prefix}{stamp_part}_{term_part}-{suffix}.jsonl")
    }
}
