//! Applying hearing-date updates to the case table.

use lexcase_shared::HearingUpdate;

use crate::database::Database;

/// Outcome of applying a batch of hearing updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    pub applied: usize,
    pub failed: usize,
}

impl Database {
    /// Apply each update as a date-only merge. A failing update is logged
    /// and skipped; the rest of the batch still runs.
    pub fn apply_hearing_updates(&self, updates: &[HearingUpdate]) -> AdvanceReport {
        let mut report = AdvanceReport::default();

        for update in updates {
            match self.put_case(&update.to_patch()) {
                Ok(_) => {
                    tracing::debug!(
                        id = %update.id,
                        current = %update.current_date,
                        next = %update.next_date,
                        "hearing advanced"
                    );
                    report.applied += 1;
                }
                Err(e) => {
                    tracing::warn!(id = %update.id, error = %e, "failed to advance hearing");
                    report.failed += 1;
                }
            }
        }

        report
    }
}
