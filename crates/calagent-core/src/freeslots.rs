//! Free-slot calculation for a single day.
//!
//! Free time is the complement of the busy intervals inside a
//! [`TimeWindow`]. Busy intervals are walked in the order the provider
//! returned them, with a cursor that only moves forward, so overlapping and
//! adjacent intervals never produce empty or negative gaps.

use crate::event::{BusyInterval, FreeInterval};
use crate::time::TimeWindow;

/// Header preceding the rendered slots.
pub const FREE_SLOTS_HEADER: &str = "Free slots:\n";

/// Computes the gaps between busy intervals inside `window`.
pub fn compute_free_slots(window: &TimeWindow, busy: &[BusyInterval]) -> Vec<FreeInterval> {
    let mut slots = Vec::new();
    let mut cursor = window.start;

    for interval in busy {
        if interval.start > cursor {
            slots.push(FreeInterval {
                start: cursor,
                end: interval.start,
            });
        }
        cursor = cursor.max(interval.end);
    }

    if cursor < window.end {
        slots.push(FreeInterval {
            start: cursor,
            end: window.end,
        });
    }

    slots
}

/// Renders a day's free time.
///
/// An empty busy list short-circuits to a "completely free" sentence
/// mentioning `date` as the caller wrote it. Otherwise the slots are listed
/// one per line under [`FREE_SLOTS_HEADER`]; a fully booked day renders
/// just the header.
pub fn summarize_free_time(date: &str, window: &TimeWindow, busy: &[BusyInterval]) -> String {
    if busy.is_empty() {
        return format!("You are completely free on {}.", date);
    }

    let lines: Vec<String> = compute_free_slots(window, busy)
        .iter()
        .map(ToString::to_string)
        .collect();

    format!("{}{}", FREE_SLOTS_HEADER, lines.join("\n"))
}
