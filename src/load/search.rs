use chrono::{Duration, NaiveDate};

/// Outcome of searching a sheet's date column for a target date.
#[derive(Debug, PartialEq)]
pub enum RowLookup {
    /// An existing row holds the target date.
    Found(u32),
    /// No row holds it; gap rows must be inserted at the crossing point.
    Missing(InsertPoint),
}

/// Where the search pointers crossed, plus the neighboring dates.
#[derive(Debug, PartialEq)]
pub struct InsertPoint {
    /// Row index the first synthesized row goes to.
    pub insert_at: u32,
    /// Date at the nearest row below the target, when one exists in range.
    pub below: Option<NaiveDate>,
    /// Date at the nearest row above the target, when one exists in range.
    pub above: Option<NaiveDate>,
}

/// Binary search rows `[first_row, last_row]` (1-based, inclusive) for the
/// row whose date equals `target`. `date_at` yields the date in a row's date
/// cell, or `None` for rows that hold no valid date; such probes are treated
/// as sorting high, so the upper bound drops below them.
pub fn find_date_row<F>(target: NaiveDate, first_row: u32, last_row: u32, date_at: F) -> RowLookup
where
    F: Fn(u32) -> Option<NaiveDate>,
{
    debug_assert!(first_row >= 1);
    let mut lo = first_row;
    let mut hi = last_row;
    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        match date_at(mid) {
            Some(date) if date == target => return RowLookup::Found(mid),
            Some(date) if date < target => lo = mid + 1,
            _ => hi = mid - 1,
        }
    }

    // Pointers crossed: hi is the last row below the target, lo the first above.
    let below = if hi >= first_row { date_at(hi) } else { None };
    let above = if lo <= last_row { date_at(lo) } else { None };
    RowLookup::Missing(InsertPoint {
        insert_at: lo,
        below,
        above,
    })
}

/// The consecutive day rows that must be synthesized for a missed target:
/// every day after the nearest known date below the target (or the day before
/// the target, when none precedes it) up to the day before the nearest known
/// date above it (or the target itself, when none follows it).
#[derive(Debug, PartialEq)]
pub struct GapPlan {
    pub insert_at: u32,
    pub first_date: NaiveDate,
    pub rows: u32,
    target_offset: u32,
}

pub fn plan_gap_fill(target: NaiveDate, point: &InsertPoint) -> GapPlan {
    let start = point.below.unwrap_or_else(|| target - Duration::days(1));
    let end = point.above.map(|d| d - Duration::days(1)).unwrap_or(target);
    let first_date = start + Duration::days(1);
    debug_assert!(first_date <= target && target <= end);

    GapPlan {
        insert_at: point.insert_at,
        first_date,
        rows: (end - start).num_days() as u32,
        target_offset: (target - first_date).num_days() as u32,
    }
}

impl GapPlan {
    /// Row index holding the target date once the plan is applied.
    pub fn target_row(&self) -> u32 {
        self.insert_at + self.target_offset
    }

    /// The dates to write, in sheet order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.rows).map(move |i| self.first_date + Duration::days(i as i64))
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    /// Sheet stand-in: row 1 is a header, rows 2.. hold the given cells.
    fn accessor(cells: Vec<Option<NaiveDate>>) -> impl Fn(u32) -> Option<NaiveDate> {
        move |row| cells.get(row as usize - 2).copied().flatten()
    }

    #[test]
    fn finds_every_existing_date() {
        let dates: Vec<_> = (1..=31).map(d).collect();
        let lookup = accessor(dates.iter().copied().map(Some).collect());
        for (i, date) in dates.iter().enumerate() {
            assert_eq!(
                find_date_row(*date, 2, 32, &lookup),
                RowLookup::Found(i as u32 + 2)
            );
        }
    }

    #[test]
    fn search_is_logarithmic() {
        let days: Vec<_> = (0i64..1024)
            .map(|i| d(1) + Duration::days(i))
            .map(Some)
            .collect();
        let probes = Cell::new(0u32);
        let lookup = accessor(days);
        let counted = |row| {
            probes.set(probes.get() + 1);
            lookup(row)
        };
        assert_eq!(
            find_date_row(d(1) + Duration::days(1023), 2, 1025, counted),
            RowLookup::Found(1025)
        );
        assert!(probes.get() <= 11, "{} probes", probes.get());
    }

    #[test]
    fn miss_between_rows_reports_neighbors() {
        let lookup = accessor(vec![Some(d(1)), Some(d(5))]);
        let point = match find_date_row(d(3), 2, 3, lookup) {
            RowLookup::Missing(p) => p,
            other => panic!("expected miss, got {other:?}"),
        };
        assert_eq!(point.insert_at, 3);
        assert_eq!(point.below, Some(d(1)));
        assert_eq!(point.above, Some(d(5)));

        let plan = plan_gap_fill(d(3), &point);
        assert_eq!(plan.insert_at, 3);
        assert_eq!(plan.rows, 3);
        assert_eq!(plan.dates().collect::<Vec<_>>(), vec![d(2), d(3), d(4)]);
        assert_eq!(plan.target_row(), 4);
    }

    #[test]
    fn miss_before_all_rows() {
        let lookup = accessor(vec![Some(d(10)), Some(d(11))]);
        let point = match find_date_row(d(7), 2, 3, lookup) {
            RowLookup::Missing(p) => p,
            other => panic!("expected miss, got {other:?}"),
        };
        assert_eq!(point.insert_at, 2);
        assert_eq!(point.below, None);
        assert_eq!(point.above, Some(d(10)));

        // Exactly |target - boundary| rows: 7, 8, 9
        let plan = plan_gap_fill(d(7), &point);
        assert_eq!(plan.rows, 3);
        assert_eq!(plan.dates().collect::<Vec<_>>(), vec![d(7), d(8), d(9)]);
        assert_eq!(plan.target_row(), 2);
    }

    #[test]
    fn miss_after_all_rows() {
        let lookup = accessor(vec![Some(d(10)), Some(d(11))]);
        let point = match find_date_row(d(14), 2, 3, lookup) {
            RowLookup::Missing(p) => p,
            other => panic!("expected miss, got {other:?}"),
        };
        assert_eq!(point.insert_at, 4);
        assert_eq!(point.below, Some(d(11)));
        assert_eq!(point.above, None);

        // Exactly |target - boundary| rows: 12, 13, 14
        let plan = plan_gap_fill(d(14), &point);
        assert_eq!(plan.rows, 3);
        assert_eq!(plan.dates().collect::<Vec<_>>(), vec![d(12), d(13), d(14)]);
        assert_eq!(plan.target_row(), 6);
    }

    #[test]
    fn adjacent_day_insert_is_single_row() {
        let lookup = accessor(vec![Some(d(1)), Some(d(2))]);
        let RowLookup::Missing(point) = find_date_row(d(3), 2, 3, lookup) else {
            panic!("expected miss");
        };
        let plan = plan_gap_fill(d(3), &point);
        assert_eq!(plan.rows, 1);
        assert_eq!(plan.target_row(), 4);
    }

    #[test]
    fn malformed_interior_row_sorts_high() {
        // Row 3 holds junk; the probe lands on it first and the search
        // continues below, so earlier targets are still found.
        let lookup = accessor(vec![Some(d(1)), None, Some(d(3)), Some(d(4))]);
        assert_eq!(find_date_row(d(1), 2, 5, &lookup), RowLookup::Found(2));
    }

    #[test]
    fn single_row_sheet() {
        let lookup = accessor(vec![Some(d(5))]);
        assert_eq!(find_date_row(d(5), 2, 2, &lookup), RowLookup::Found(2));
        let RowLookup::Missing(point) = find_date_row(d(8), 2, 2, &lookup) else {
            panic!("expected miss");
        };
        assert_eq!(plan_gap_fill(d(8), &point).rows, 3);
    }
}
