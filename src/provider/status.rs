//! Provider status vocabulary.
//!
//! Different provider endpoints spell the same state differently
//! (`completed` vs `finished`, `processing` vs `running`). Every spelling is
//! folded into a [`StatusClass`] here and nowhere else.

use tracing::warn;

/// Coarse class of a raw provider status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Queued,
    Running,
    Finished,
    Failed,
}

/// Classify a raw status string. Unknown spellings count as running so the
/// polling loop keeps going until its attempt bound.
pub fn normalize_status(raw: &str) -> StatusClass {
    let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");

    match normalized.as_str() {
        "queued" | "pending" | "waiting" | "created" | "scheduled" => StatusClass::Queued,
        "processing" | "running" | "started" | "in_progress" => StatusClass::Running,
        "finished" | "completed" | "complete" | "succeeded" | "success" | "done" => {
            StatusClass::Finished
        }
        "error" | "failed" | "failure" | "cancelled" | "canceled" | "aborted" => {
            StatusClass::Failed
        }
        _ => {
            warn!("Unrecognized provider status '{}', treating as running", raw);
            StatusClass::Running
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synonyms() {
        for raw in ["finished", "completed", "Completed", " DONE ", "succeeded"] {
            assert_eq!(normalize_status(raw), StatusClass::Finished, "{raw}");
        }
        for raw in ["processing", "running", "in-progress", "In Progress", "started"] {
            assert_eq!(normalize_status(raw), StatusClass::Running, "{raw}");
        }
        for raw in ["queued", "pending"] {
            assert_eq!(normalize_status(raw), StatusClass::Queued, "{raw}");
        }
        for raw in ["error", "failed", "cancelled", "canceled"] {
            assert_eq!(normalize_status(raw), StatusClass::Failed, "{raw}");
        }
    }

    #[test]
    fn test_unknown_status_keeps_polling() {
        assert_eq!(normalize_status("warming_up"), StatusClass::Running);
        assert_eq!(normalize_status(""), StatusClass::Running);
    }
}
