//! Detection of overlapping weekly sessions within one student's schedule.
//!
//! The check only ever looks at the entries it is given. Other students' schedules are never
//! consulted, so two students may share a therapist slot.

use crate::models::Weekday;
use chrono::NaiveTime;
use std::fmt;

/// A candidate weekly session as submitted. Any of the scheduling fields may be missing, for
/// instance on a blank trailing form row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub therapy: String,
    pub weekday: Option<Weekday>,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
}

impl ScheduleEntry {
    pub fn new(therapy: impl Into<String>, weekday: Weekday, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            therapy: therapy.into(),
            weekday: Some(weekday),
            start: Some(start),
            end: Some(end),
        }
    }

    fn slot(&self) -> Option<Slot> {
        Some(Slot {
            therapy: self.therapy.clone(),
            weekday: self.weekday?,
            start: self.start?,
            end: self.end?,
        })
    }
}

/// A fully specified weekly session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub therapy: String,
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Slot {
    /// A slot that ends where it starts occupies no time.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Two slots collide when they share a weekday and their half-open intervals intersect.
    /// An empty slot never collides with anything.
    pub fn collides_with(&self, other: &Slot) -> bool {
        self.weekday == other.weekday
            && !self.is_empty()
            && !other.is_empty()
            && overlaps(self.start, self.end, other.start, other.end)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' ({} {}-{})",
            self.therapy,
            self.weekday,
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// The first pair of colliding sessions found in a schedule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("schedule conflict: {first} collides with {second}")]
pub struct ScheduleConflict {
    pub first: Slot,
    pub second: Slot,
}

/// Half-open interval intersection test for `[a_start, a_end)` and `[b_start, b_end)`.
///
/// Touching intervals do not overlap. The formula alone would report an empty interval lying
/// strictly inside another one, which is why [`Slot::collides_with`] screens empty slots first.
pub fn overlaps(a_start: NaiveTime, a_end: NaiveTime, b_start: NaiveTime, b_end: NaiveTime) -> bool {
    a_start < b_end && b_start < a_end
}

/// Checks a complete candidate schedule for one student.
///
/// Entries missing a weekday, start or end are ignored. Pairs are scanned in list order and the
/// first collision is returned.
pub fn check_schedule(entries: &[ScheduleEntry]) -> Result<(), ScheduleConflict> {
    let slots: Vec<Slot> = entries.iter().filter_map(ScheduleEntry::slot).collect();

    for (i, first) in slots.iter().enumerate() {
        if let Some(second) = slots[i + 1..].iter().find(|other| first.collides_with(other)) {
            return Err(ScheduleConflict {
                first: first.clone(),
                second: second.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use Weekday::*;

    fn t(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn entry(therapy: &str, weekday: Weekday, start: NaiveTime, end: NaiveTime) -> ScheduleEntry {
        ScheduleEntry::new(therapy, weekday, start, end)
    }

    #[test]
    fn overlap_is_the_half_open_formula() {
        let times = [t(8, 0), t(8, 30), t(9, 0), t(9, 30), t(10, 0)];
        for &a_start in &times {
            for &a_end in &times {
                for &b_start in &times {
                    for &b_end in &times {
                        assert_eq!(
                            overlaps(a_start, a_end, b_start, b_end),
                            a_start < b_end && b_start < a_end
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn non_empty_sessions_conflict_exactly_when_they_overlap() {
        let times = [t(8, 0), t(8, 30), t(9, 0), t(9, 30), t(10, 0)];
        for (i, &a_start) in times.iter().enumerate() {
            for &a_end in &times[i + 1..] {
                for (j, &b_start) in times.iter().enumerate() {
                    for &b_end in &times[j + 1..] {
                        let schedule = [
                            entry("A", Monday, a_start, a_end),
                            entry("B", Monday, b_start, b_end),
                        ];
                        assert_eq!(
                            check_schedule(&schedule).is_err(),
                            a_start < b_end && b_start < a_end
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn touching_sessions_do_not_conflict() {
        let schedule = [
            entry("Speech", Tuesday, t(8, 0), t(9, 0)),
            entry("Music", Tuesday, t(9, 0), t(10, 0)),
        ];

        assert_eq!(check_schedule(&schedule), Ok(()));
    }

    #[test]
    fn identical_sessions_conflict() {
        let schedule = [
            entry("Speech", Tuesday, t(8, 0), t(9, 0)),
            entry("Speech", Tuesday, t(8, 0), t(9, 0)),
        ];

        assert!(check_schedule(&schedule).is_err());
    }

    #[test]
    fn zero_length_sessions_do_not_conflict_with_each_other_or_at_edges() {
        let schedule = [
            entry("Check-in", Wednesday, t(9, 0), t(9, 0)),
            entry("Check-in", Wednesday, t(9, 0), t(9, 0)),
            entry("Speech", Wednesday, t(8, 0), t(9, 0)),
            entry("Music", Wednesday, t(9, 0), t(10, 0)),
        ];

        assert_eq!(check_schedule(&schedule), Ok(()));
    }

    #[test]
    fn zero_length_session_inside_another_does_not_conflict() {
        let schedule = [
            entry("Speech", Wednesday, t(8, 0), t(9, 0)),
            entry("Check-in", Wednesday, t(8, 30), t(8, 30)),
        ];

        assert_eq!(check_schedule(&schedule), Ok(()));
    }

    #[test]
    fn different_weekdays_never_conflict() {
        let schedule = [
            entry("Speech", Monday, t(8, 0), t(9, 0)),
            entry("Music", Thursday, t(8, 0), t(9, 0)),
        ];

        assert_eq!(check_schedule(&schedule), Ok(()));
    }

    #[test]
    fn empty_and_single_schedules_are_valid() {
        assert_eq!(check_schedule(&[]), Ok(()));
        assert_eq!(check_schedule(&[entry("Speech", Friday, t(8, 0), t(9, 0))]), Ok(()));
    }

    #[test]
    fn incomplete_entries_are_skipped() {
        let blank = ScheduleEntry {
            therapy: "Speech".to_string(),
            weekday: Some(Monday),
            start: Some(t(8, 0)),
            end: None,
        };
        let schedule = [entry("Music", Monday, t(8, 0), t(9, 0)), blank];

        assert_eq!(check_schedule(&schedule), Ok(()));
    }

    #[test]
    fn reports_first_pair_in_list_order() {
        let schedule = [
            entry("A", Monday, t(8, 0), t(9, 0)),
            entry("B", Tuesday, t(10, 0), t(11, 0)),
            entry("C", Monday, t(8, 30), t(9, 30)),
            entry("D", Monday, t(8, 45), t(9, 15)),
        ];

        let conflict = check_schedule(&schedule).unwrap_err();
        assert_eq!(conflict.first.therapy, "A");
        assert_eq!(conflict.second.therapy, "C");
        assert_eq!(
            conflict.to_string(),
            "schedule conflict: 'A' (Monday 08:00-09:00) collides with 'C' (Monday 08:30-09:30)"
        );
    }
}
