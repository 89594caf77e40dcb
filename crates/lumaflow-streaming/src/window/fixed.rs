//! Fixed windows
//!
//! Fixed (tumbling) windows are defined by a static length, e.g. minutely or
//! hourly windows, aligned to the epoch so every window applies across all the
//! data of its period. [`Fixed`] also owns the active keyed windows of a vertex
//! and expires them as the watermark advances.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use tracing::{debug, warn};

use lumaflow_common::metric_names::{WINDOWS_CLOSED, WINDOWS_CREATED};
use lumaflow_common::{Error, Result};

use super::{IntervalWindow, KeyedWindow, Windower};

/// Fixed windower.
///
/// Active windows are kept in ascending order of start time, earliest at the head.
/// Most keys belong to the most recent window, so get and create traverse from the
/// tail; earlier windows close first, so remove traverses from the head. Worst case
/// is O(n) for a badly out-of-order stream, amortized close to O(1) otherwise.
#[derive(Debug)]
pub struct Fixed {
    length: Duration,
    length_ms: i64,
    length_delta: TimeDelta,
    entries: RwLock<VecDeque<Arc<KeyedWindow>>>,
}

impl Fixed {
    /// Window boundaries are aligned at millisecond resolution.
    pub fn new(length: Duration) -> Result<Self> {
        let length_ms = i64::try_from(length.as_millis())
            .map_err(|_| Error::InvalidWindowLength(length))?;
        if length_ms == 0 {
            return Err(Error::InvalidWindowLength(length));
        }
        let length_delta =
            TimeDelta::try_milliseconds(length_ms).ok_or(Error::InvalidWindowLength(length))?;
        Ok(Self {
            length,
            length_ms,
            length_delta,
            entries: RwLock::new(VecDeque::new()),
        })
    }

    pub fn length(&self) -> Duration {
        self.length
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Active windows, earliest first.
    pub fn active_windows(&self) -> Vec<Arc<KeyedWindow>> {
        self.entries.read().iter().cloned().collect()
    }

    /// The earliest window still open. Its start bounds the lowest watermark
    /// this vertex can publish.
    pub fn oldest_window(&self) -> Option<IntervalWindow> {
        self.entries.read().front().map(|kw| *kw.window())
    }

    fn insert_at(
        entries: &mut VecDeque<Arc<KeyedWindow>>,
        slot: usize,
        window: &IntervalWindow,
    ) -> Arc<KeyedWindow> {
        let kw = Arc::new(KeyedWindow::new(*window));
        entries.insert(slot, Arc::clone(&kw));

        debug!(window = %window, active = entries.len(), "created window");
        metrics::counter!(WINDOWS_CREATED).increment(1);
        kw
    }

    /// Slot for a window that sorts between the earliest and the latest entry.
    /// Entries are ordered by start, then end, so windows that are not aligned
    /// to the length still keep the list sorted.
    fn interior_slot(
        entries: &VecDeque<Arc<KeyedWindow>>,
        window: &IntervalWindow,
    ) -> std::result::Result<usize, Arc<KeyedWindow>> {
        let mut slot = entries.len();
        for (pos, kw) in entries.iter().enumerate().rev() {
            match kw.window().cmp(window) {
                Ordering::Greater => slot = pos,
                Ordering::Equal => return Err(Arc::clone(kw)),
                Ordering::Less => break,
            }
        }
        Ok(slot)
    }

    fn truncate(&self, event_time: DateTime<Utc>) -> Option<IntervalWindow> {
        // Truncating to the window length puts an event that sits exactly on a
        // boundary into the window to the right of it.
        let offset_ms = event_time.timestamp_millis().rem_euclid(self.length_ms);
        let sub_ns = i64::from(event_time.timestamp_subsec_nanos() % 1_000_000);

        let start = event_time
            .checked_sub_signed(TimeDelta::milliseconds(offset_ms))?
            .checked_sub_signed(TimeDelta::nanoseconds(sub_ns))?;
        let end = start.checked_add_signed(self.length_delta)?;
        Some(IntervalWindow::new(start, end))
    }
}

impl Windower for Fixed {
    fn assign_window(&self, event_time: DateTime<Utc>) -> Vec<IntervalWindow> {
        match self.truncate(event_time) {
            Some(window) => vec![window],
            None => {
                warn!(
                    event_time = %event_time,
                    length_ms = self.length_ms,
                    "window bounds out of range, event not assigned"
                );
                Vec::new()
            }
        }
    }

    fn create_window(&self, window: &IntervalWindow) -> Arc<KeyedWindow> {
        let mut entries = self.entries.write();

        let slot = match (entries.front(), entries.back()) {
            // first window
            (None, _) | (_, None) => 0,
            // late arrival
            (Some(earliest), _) if earliest.window() > window => 0,
            // early arrival
            (_, Some(latest)) if latest.window() < window => entries.len(),
            _ => match Self::interior_slot(&entries, window) {
                Ok(slot) => slot,
                Err(existing) => return existing,
            },
        };

        Self::insert_at(&mut entries, slot, window)
    }

    fn get_window(&self, window: &IntervalWindow) -> Option<Arc<KeyedWindow>> {
        let entries = self.entries.read();

        // later than the current latest?
        if entries.back()?.window() < window {
            return None;
        }

        // earlier than the current earliest?
        if entries.front()?.window() > window {
            return None;
        }

        for kw in entries.iter().rev() {
            match kw.window().cmp(window) {
                Ordering::Equal => return Some(Arc::clone(kw)),
                // moved past the range we are looking for
                Ordering::Less => break,
                Ordering::Greater => {}
            }
        }
        None
    }

    fn remove_windows(&self, watermark: DateTime<Utc>) -> Vec<Arc<KeyedWindow>> {
        let mut entries = self.entries.write();
        let mut closed = Vec::new();

        // Only once the watermark is strictly past the end. Start order implies
        // end order for aligned windows, so the first open window ends the scan.
        while entries.front().is_some_and(|kw| kw.end() < watermark) {
            closed.extend(entries.pop_front());
        }

        if !closed.is_empty() {
            debug!(
                watermark = watermark.timestamp_millis(),
                closed = closed.len(),
                active = entries.len(),
                "closed windows"
            );
            metrics::counter!(WINDOWS_CLOSED).increment(closed.len() as u64);
        }

        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::thread;

    fn ts(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn secs(s: i64) -> DateTime<Utc> {
        ts(s * 1000)
    }

    fn window(start_s: i64, end_s: i64) -> IntervalWindow {
        IntervalWindow::new(secs(start_s), secs(end_s))
    }

    fn starts(fixed: &Fixed) -> Vec<i64> {
        fixed
            .active_windows()
            .iter()
            .map(|kw| kw.start().timestamp())
            .collect()
    }

    fn minutely() -> Fixed {
        Fixed::new(Duration::from_secs(60)).unwrap()
    }

    #[test]
    fn test_zero_length_rejected() {
        let err = Fixed::new(Duration::ZERO).unwrap_err();
        assert!(matches!(err, Error::InvalidWindowLength(_)));

        // sub-millisecond lengths cannot be aligned either
        assert!(Fixed::new(Duration::from_micros(10)).is_err());
    }

    #[rstest]
    #[case::inside(5, 0, 60)]
    #[case::left_boundary(60, 60, 120)]
    #[case::just_before_boundary(119, 60, 120)]
    #[case::epoch(0, 0, 60)]
    #[case::negative(-1, -60, 0)]
    #[case::negative_boundary(-60, -60, 0)]
    fn test_assign_window(#[case] event_s: i64, #[case] start_s: i64, #[case] end_s: i64) {
        let windows = minutely().assign_window(secs(event_s));
        assert_eq!(windows, vec![window(start_s, end_s)]);
    }

    #[test]
    fn test_assign_window_sub_millisecond() {
        let fixed = minutely();
        let event_time = secs(59) + TimeDelta::nanoseconds(999_999_999);
        assert_eq!(fixed.assign_window(event_time), vec![window(0, 60)]);
    }

    #[test]
    fn test_assign_window_out_of_range() {
        let fixed = minutely();
        assert!(fixed.assign_window(DateTime::<Utc>::MAX_UTC).is_empty());

        // the last window that still fits is assigned
        let last = fixed.assign_window(DateTime::<Utc>::MAX_UTC - TimeDelta::days(1));
        assert_eq!(last.len(), 1);
    }

    #[test]
    fn test_create_first_window() {
        let fixed = minutely();
        let kw = fixed.create_window(&window(60, 120));
        assert_eq!(*kw.window(), window(60, 120));
        assert_eq!(fixed.len(), 1);
    }

    #[test]
    fn test_create_late_and_early_arrivals() {
        let fixed = minutely();
        fixed.create_window(&window(120, 180));
        // late arrival goes to the head
        fixed.create_window(&window(60, 120));
        // early arrival goes to the tail
        fixed.create_window(&window(240, 300));
        fixed.create_window(&window(0, 60));

        assert_eq!(starts(&fixed), vec![0, 60, 120, 240]);
    }

    #[test]
    fn test_create_interior_window() {
        let fixed = minutely();
        fixed.create_window(&window(0, 60));
        fixed.create_window(&window(120, 180));
        fixed.create_window(&window(240, 300));
        fixed.create_window(&window(360, 420));

        // lands two entries away from the tail
        fixed.create_window(&window(60, 120));
        assert_eq!(starts(&fixed), vec![0, 60, 120, 240, 360]);

        // lands right before the tail
        fixed.create_window(&window(300, 360));
        assert_eq!(starts(&fixed), vec![0, 60, 120, 240, 300, 360]);
    }

    #[test]
    fn test_create_existing_window_returns_same_instance() {
        let fixed = minutely();
        let first = fixed.create_window(&window(0, 60));
        fixed.create_window(&window(60, 120));
        fixed.create_window(&window(120, 180));

        for w in [window(0, 60), window(60, 120), window(120, 180)] {
            let existing = fixed.get_window(&w).unwrap();
            let again = fixed.create_window(&w);
            assert!(Arc::ptr_eq(&existing, &again));
        }
        assert!(Arc::ptr_eq(&first, &fixed.create_window(&window(0, 60))));
        assert_eq!(fixed.len(), 3);
    }

    #[test]
    fn test_create_unaligned_window_keeps_order() {
        let fixed = minutely();
        fixed.create_window(&window(60, 120));
        fixed.create_window(&window(0, 61));
        fixed.create_window(&window(0, 60));
        fixed.create_window(&window(90, 100));

        assert_eq!(starts(&fixed), vec![0, 0, 60, 90]);
        let bounds: Vec<_> = fixed.active_windows().iter().map(|kw| *kw.window()).collect();
        assert!(bounds.windows(2).all(|pair| pair[0] < pair[1]));

        for w in [window(60, 120), window(0, 61), window(0, 60), window(90, 100)] {
            let found = fixed.get_window(&w).unwrap();
            assert_eq!(*found.window(), w);
            assert!(Arc::ptr_eq(&found, &fixed.create_window(&w)));
        }
        assert_eq!(fixed.len(), 4);
        assert!(fixed.get_window(&window(0, 30)).is_none());
    }

    #[test]
    fn test_get_window_after_create() {
        let fixed = minutely();
        let created = fixed.create_window(&window(60, 120));
        created.add_key("a");

        let found = fixed.get_window(&window(60, 120)).unwrap();
        assert!(Arc::ptr_eq(&created, &found));
        assert_eq!(found.keys(), vec!["a".to_string()]);
    }

    #[test]
    fn test_get_window_not_found() {
        let fixed = minutely();
        assert!(fixed.get_window(&window(0, 60)).is_none());

        fixed.create_window(&window(60, 120));
        fixed.create_window(&window(180, 240));

        // later than the latest
        assert!(fixed.get_window(&window(240, 300)).is_none());
        // earlier than the earliest
        assert!(fixed.get_window(&window(0, 60)).is_none());
        // a gap in between
        assert!(fixed.get_window(&window(120, 180)).is_none());
    }

    #[test]
    fn test_remove_windows_is_strict() {
        let fixed = minutely();
        fixed.create_window(&window(0, 60));
        fixed.create_window(&window(60, 120));

        // watermark exactly on the end does not close the window
        assert!(fixed.remove_windows(secs(60)).is_empty());
        assert_eq!(fixed.len(), 2);

        let closed = fixed.remove_windows(secs(60) + TimeDelta::milliseconds(1));
        assert_eq!(closed.len(), 1);
        assert_eq!(*closed[0].window(), window(0, 60));
        assert_eq!(starts(&fixed), vec![60]);
    }

    #[test]
    fn test_remove_windows_earliest_first() {
        let fixed = minutely();
        for start in [240, 0, 120, 60, 180] {
            fixed.create_window(&window(start, start + 60));
        }

        let closed = fixed.remove_windows(secs(181));
        let closed_starts: Vec<i64> = closed.iter().map(|kw| kw.start().timestamp()).collect();
        assert_eq!(closed_starts, vec![0, 60, 120]);
        assert_eq!(starts(&fixed), vec![180, 240]);
        assert_eq!(fixed.oldest_window(), Some(window(180, 240)));

        assert!(fixed.remove_windows(secs(0)).is_empty());
        assert_eq!(fixed.remove_windows(secs(1000)).len(), 2);
        assert!(fixed.is_empty());
        assert_eq!(fixed.oldest_window(), None);
    }

    #[test]
    fn test_out_of_order_events() {
        let fixed = minutely();

        for (event_s, key) in [(5, "a"), (65, "b"), (125, "c"), (40, "d")] {
            for w in fixed.assign_window(secs(event_s)) {
                let kw = match fixed.get_window(&w) {
                    Some(kw) => kw,
                    None => fixed.create_window(&w),
                };
                kw.add_key(key);
            }
        }

        assert_eq!(starts(&fixed), vec![0, 60, 120]);
        let first = fixed.get_window(&window(0, 60)).unwrap();
        assert_eq!(first.key_count(), 2);
    }

    #[test]
    fn test_concurrent_create_single_window() {
        let fixed = Arc::new(minutely());

        thread::scope(|s| {
            for _ in 0..8 {
                let fixed = Arc::clone(&fixed);
                s.spawn(move || {
                    for start in (0..600).step_by(60) {
                        let w = window(start, start + 60);
                        let kw = fixed
                            .get_window(&w)
                            .unwrap_or_else(|| fixed.create_window(&w));
                        kw.add_key("k");
                    }
                });
            }
        });

        assert_eq!(fixed.len(), 10);
        assert_eq!(starts(&fixed), (0..600).step_by(60).collect::<Vec<_>>());
    }

    proptest! {
        #[test]
        fn prop_assign_window_contains_event(
            event_ms in -1_000_000_000_000i64..1_000_000_000_000i64,
            length_ms in 1u64..86_400_000u64,
        ) {
            let fixed = Fixed::new(Duration::from_millis(length_ms)).unwrap();
            let windows = fixed.assign_window(ts(event_ms));
            prop_assert_eq!(windows.len(), 1);

            let w = windows[0];
            prop_assert!(w.contains(ts(event_ms)));
            prop_assert_eq!(w.start.timestamp_millis().rem_euclid(length_ms as i64), 0);
            prop_assert_eq!(
                w.end.timestamp_millis() - w.start.timestamp_millis(),
                length_ms as i64
            );
        }

        #[test]
        fn prop_active_windows_ordered_and_expiry(
            event_secs in proptest::collection::vec(0i64..36_000, 1..200),
            watermark_s in 0i64..36_000,
        ) {
            let fixed = minutely();
            for s in &event_secs {
                for w in fixed.assign_window(secs(*s)) {
                    if fixed.get_window(&w).is_none() {
                        fixed.create_window(&w);
                    }
                }
            }

            let active = starts(&fixed);
            prop_assert!(active.windows(2).all(|pair| pair[0] < pair[1]));

            let watermark = secs(watermark_s);
            let closed = fixed.remove_windows(watermark);
            prop_assert!(closed.iter().all(|kw| kw.end() < watermark));
            prop_assert!(fixed.active_windows().iter().all(|kw| kw.end() >= watermark));
            prop_assert_eq!(closed.len() + fixed.len(), active.len());
        }
    }
}
