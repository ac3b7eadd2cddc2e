//! Deterministic downtime identifiers
//!
//! Downtimes carry no client-controlled id, so each comment ends with a tag
//! derived from the host name. Later runs recognise their own windows by
//! that suffix.
//!
//! The host name is hashed as its UTF-8 bytes. Callers must normalise the
//! name (case, unicode form) before calling; no normalisation happens here.

use sha2::{Digest, Sha256};

/// Tag prefix shared with windows created by earlier tooling
pub const IDENT_PREFIX: &str = "ansible_id=";

/// Hex characters of the digest kept in the tag
const IDENT_LEN: usize = 16;

const DEFAULT_COMMENT: &str = "Created by opsview-reconcile.";

/// Identifier tag for `host`: `ansible_id=` plus 16 lowercase hex characters
#[must_use]
pub fn downtime_ident(host: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(host.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{IDENT_PREFIX}{}", &digest[..IDENT_LEN])
}

/// Comment for a new downtime, always ending with the host's tag
#[must_use]
pub fn downtime_comment(host: &str, comment: Option<&str>) -> String {
    let ident = downtime_ident(host);
    match comment {
        Some(comment) if !comment.is_empty() => format!("{comment} {ident}"),
        _ => format!("{DEFAULT_COMMENT} {ident}"),
    }
}
