//! Result of a reconciliation run

use serde::Serialize;

use opsview_api::ReloadStatus;

/// What a reconciliation did
///
/// Serialises as one flat object; a reload's final status snapshot is merged
/// into the top level. The snapshot never carries `changed` or `warnings`,
/// so the outcome's own fields are the ones reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Outcome {
    /// Whether any remote state was modified
    pub changed: bool,
    /// Non-fatal conditions worth reporting
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Final reload status, for reload runs
    #[serde(flatten)]
    pub status: Option<ReloadStatus>,
}

impl Outcome {
    #[must_use]
    pub fn changed() -> Self {
        Self {
            changed: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn unchanged() -> Self {
        Self::default()
    }
}
