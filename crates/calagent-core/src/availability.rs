//! Conflict reporting for availability checks.

use crate::event::Event;

/// Calendars whose name contains any of these never count as conflicts.
pub const EXCLUDED_CALENDARS: &[&str] = &["Holidays", "Birthdays", "Contacts"];

/// Reported when no calendar has an event in the queried window.
pub const FREE_MESSAGE: &str = "You are completely free across all your calendars.";

/// Returns `true` if events from this calendar are ignored.
///
/// Matching is a case-sensitive substring test.
pub fn is_excluded(display_name: &str) -> bool {
    EXCLUDED_CALENDARS
        .iter()
        .any(|excluded| display_name.contains(*excluded))
}

/// Renders the outcome of an availability check.
///
/// Events are listed in the order given, which is calendar order and then
/// start order within each calendar.
pub fn format_conflicts(events: &[Event]) -> String {
    if events.is_empty() {
        return FREE_MESSAGE.to_string();
    }

    let described: Vec<String> = events.iter().map(Event::describe).collect();
    format!("Conflicts found: {}", described.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventStart;

    #[test]
    fn exclusion_matches_substrings() {
        assert!(is_excluded("Birthdays"));
        assert!(is_excluded("UK Holidays"));
        assert!(is_excluded("Holidays in France"));
        assert!(is_excluded("Contacts"));
        assert!(!is_excluded("Work"));
    }

    #[test]
    fn exclusion_is_case_sensitive() {
        assert!(!is_excluded("birthdays"));
        assert!(!is_excluded("uk holidays"));
    }

    #[test]
    fn no_events_means_free() {
        assert_eq!(
            format_conflicts(&[]),
            "You are completely free across all your calendars."
        );
    }

    #[test]
    fn conflicts_listed_in_order() {
        let events = vec![
            Event::new(
                Some("Standup".into()),
                EventStart::DateTime("2026-01-26T09:00:00Z".into()),
                "Work",
            ),
            Event::new(
                Some("Dentist".into()),
                EventStart::DateTime("2026-01-26T14:00:00Z".into()),
                "Personal",
            ),
        ];

        insta::assert_snapshot!(
            format_conflicts(&events),
            @"Conflicts found: Standup (on Work) at 2026-01-26T09:00:00Z, Dentist (on Personal) at 2026-01-26T14:00:00Z"
        );
    }

    #[test]
    fn all_day_conflict_uses_date() {
        let events = vec![Event::new(
            None,
            EventStart::Date("2026-01-26".into()),
            "Personal",
        )];
        assert_eq!(
            format_conflicts(&events),
            "Conflicts found: (No title) (on Personal) at 2026-01-26"
        );
    }
}
