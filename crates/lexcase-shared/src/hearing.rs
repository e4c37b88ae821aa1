//! Hearing-date auto-advance.
//!
//! A case's `current_date` is the next hearing. Once that date has passed,
//! the case rolls forward: the old `next_date` becomes the new current
//! hearing (or, without one, the old current date plus one cadence), and
//! the candidate keeps stepping by the cadence until it is no longer in the
//! past. A case left untouched for months therefore catches up in one pass.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::case::{CasePatch, CaseRecord};
use crate::constants::HEARING_CADENCE_DAYS;
use crate::types::CaseId;

/// New hearing dates computed for one case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HearingUpdate {
    pub id: CaseId,
    pub current_date: NaiveDate,
    pub next_date: NaiveDate,
}

impl HearingUpdate {
    pub fn to_patch(&self) -> CasePatch {
        CasePatch::hearing(self.id.clone(), self.current_date, self.next_date)
    }
}

fn cadence() -> Duration {
    Duration::days(HEARING_CADENCE_DAYS)
}

/// Default follow-up hearing for a given hearing date.
pub fn default_next_date(current: NaiveDate) -> NaiveDate {
    current + cadence()
}

/// Roll a single lapsed case forward, or `None` if it needs no change.
pub fn advance_one(record: &CaseRecord, today: NaiveDate) -> Option<HearingUpdate> {
    let current = record.current_date?;
    if current >= today {
        return None;
    }

    let mut candidate = record.next_date.unwrap_or_else(|| default_next_date(current));
    while candidate < today {
        candidate += cadence();
    }

    Some(HearingUpdate {
        id: record.id.clone(),
        current_date: candidate,
        next_date: default_next_date(candidate),
    })
}

/// Compute the updates needed to bring every lapsed case up to `today`.
///
/// Cases without a current hearing, or whose hearing is today or later,
/// produce no update.
pub fn advance<'a, I>(records: I, today: NaiveDate) -> Vec<HearingUpdate>
where
    I: IntoIterator<Item = &'a CaseRecord>,
{
    records
        .into_iter()
        .filter_map(|record| advance_one(record, today))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::parse_date;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn case(id: &str, current: Option<&str>, next: Option<&str>) -> CaseRecord {
        CaseRecord {
            current_date: current.map(date),
            next_date: next.map(date),
            ..CaseRecord::new(CaseId::from(id))
        }
    }

    #[test]
    fn long_lapsed_case_catches_up_from_next_date() {
        let record = case("1", Some("2020-01-01"), Some("2020-02-01"));
        let today = date("2024-06-01");

        let update = advance_one(&record, today).expect("lapsed case must advance");

        // Smallest 30-day multiple from 2020-02-01 that reaches today.
        let start = date("2020-02-01");
        let gap = (today - start).num_days();
        let steps = (gap + HEARING_CADENCE_DAYS - 1) / HEARING_CADENCE_DAYS;
        let expected = start + Duration::days(steps * HEARING_CADENCE_DAYS);

        assert_eq!(update.current_date, expected);
        assert_eq!(update.current_date, date("2024-06-09"));
        assert_eq!(update.next_date, date("2024-07-09"));
        assert!(update.current_date - Duration::days(HEARING_CADENCE_DAYS) < today);
    }

    #[test]
    fn missing_next_date_steps_from_current_date() {
        let record = case("2", Some("2024-05-01"), None);
        let update = advance_one(&record, date("2024-05-10")).unwrap();
        assert_eq!(update.current_date, date("2024-05-31"));
        assert_eq!(update.next_date, date("2024-06-30"));
    }

    #[test]
    fn next_date_already_in_future_is_taken_as_is() {
        let record = case("3", Some("2024-05-01"), Some("2024-05-20"));
        let update = advance_one(&record, date("2024-05-10")).unwrap();
        assert_eq!(update.current_date, date("2024-05-20"));
        assert_eq!(update.next_date, date("2024-06-19"));
    }

    #[test]
    fn candidate_landing_on_today_stops() {
        let record = case("4", Some("2024-04-01"), None);
        let update = advance_one(&record, date("2024-05-01")).unwrap();
        assert_eq!(update.current_date, date("2024-05-01"));
    }

    #[test]
    fn untouched_cases_emit_nothing() {
        let today = date("2024-06-01");
        let records = [
            case("no-date", None, Some("2020-01-01")),
            case("today", Some("2024-06-01"), None),
            case("future", Some("2025-01-01"), Some("2025-01-31")),
        ];
        assert!(advance(&records, today).is_empty());
    }

    #[test]
    fn every_update_keeps_cadence_and_reaches_today() {
        let today = date("2024-06-01");
        let records = [
            case("a", Some("2023-12-25"), Some("2024-01-24")),
            case("b", Some("2019-07-04"), None),
            case("c", Some("2024-05-31"), Some("2024-06-15")),
            case("d", None, None),
        ];

        let updates = advance(&records, today);
        assert_eq!(updates.len(), 3);
        for update in &updates {
            assert!(update.current_date >= today);
            assert_eq!(update.next_date, update.current_date + Duration::days(30));
        }
    }

    #[test]
    fn update_converts_to_date_only_patch() {
        let update = HearingUpdate {
            id: CaseId::from("9"),
            current_date: date("2024-06-09"),
            next_date: date("2024-07-09"),
        };
        let patch = update.to_patch();
        assert_eq!(patch.current_date, Some(Some(date("2024-06-09"))));
        assert_eq!(patch.case_title, None);
        assert_eq!(patch.files, None);
    }
}
