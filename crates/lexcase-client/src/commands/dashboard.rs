//! Dashboard summary.

use chrono::NaiveDate;
use serde::Serialize;

use lexcase_shared::CaseId;

use crate::state::AppState;

/// Upcoming hearings shown on the dashboard.
const NEXT_HEARINGS_SHOWN: usize = 5;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UpcomingHearing {
    pub id: CaseId,
    pub case_title: String,
    pub client_name: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub total_cases: usize,
    /// Cases whose current hearing is after `today`.
    pub upcoming: usize,
    pub pending_files: usize,
    /// Soonest upcoming hearings first.
    pub next_hearings: Vec<UpcomingHearing>,
}

pub fn dashboard(state: &AppState, today: NaiveDate) -> Dashboard {
    let cases = state.cases();

    let mut upcoming: Vec<UpcomingHearing> = cases
        .iter()
        .filter_map(|c| {
            let date = c.current_date.filter(|d| *d > today)?;
            Some(UpcomingHearing {
                id: c.id.clone(),
                case_title: c.case_title.clone(),
                client_name: c.client_name.clone(),
                date,
            })
        })
        .collect();
    upcoming.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

    Dashboard {
        total_cases: cases.len(),
        upcoming: upcoming.len(),
        pending_files: cases.iter().map(|c| c.pending_files()).sum(),
        next_hearings: upcoming.into_iter().take(NEXT_HEARINGS_SHOWN).collect(),
    }
}
