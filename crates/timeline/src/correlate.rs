//! Generic fold of timestamped items onto time-bounded windows.
//!
//! # Algorithm
//!
//! 1. For each item, find every window whose inclusive `[start, end]`
//!    bounds contain the item's timestamp. Windows are not assumed
//!    disjoint; one item may land in several.
//! 2. The first item matched to a window builds that window's record
//!    via `combine_new`; later items are appended via
//!    `combine_existing`.
//! 3. Windows that matched nothing get a default record via `or_else`.
//! 4. Output order: records with data first, in first-match order, then
//!    defaults in original window order.

use std::collections::HashMap;

/// Fold `items` onto `windows`, producing exactly one record per window.
///
/// `bounds` yields a window's inclusive `(start, end)` pair and
/// `item_time` an item's position on the same axis. `combine_new` and
/// `combine_existing` receive the item's index in `items`, which
/// specializations use to look at neighbouring samples.
pub fn correlate<W, T, R>(
    windows: &[W],
    items: &[T],
    bounds: impl Fn(&W) -> (f64, f64),
    item_time: impl Fn(&T) -> f64,
    mut combine_new: impl FnMut(&W, &T, usize) -> R,
    mut combine_existing: impl FnMut(&mut R, &T, usize),
    mut or_else: impl FnMut(&W) -> R,
) -> Vec<R> {
    let mut matched: Vec<R> = Vec::new();
    let mut slot_of_window: HashMap<usize, usize> = HashMap::new();

    for (item_index, item) in items.iter().enumerate() {
        let time = item_time(item);
        for (window_index, window) in windows.iter().enumerate() {
            let (start, end) = bounds(window);
            if time < start || time > end {
                continue;
            }
            match slot_of_window.get(&window_index) {
                Some(&slot) => combine_existing(&mut matched[slot], item, item_index),
                None => {
                    slot_of_window.insert(window_index, matched.len());
                    matched.push(combine_new(window, item, item_index));
                }
            }
        }
    }

    for (window_index, window) in windows.iter().enumerate() {
        if !slot_of_window.contains_key(&window_index) {
            matched.push(or_else(window));
        }
    }

    matched
}
