//! Splitting of date intervals into endpoint-legal request ranges
//!
//! The export endpoint limits how much history a single request may cover:
//!
//! | class | period codes | max span |
//! |---|---|---|
//! | tick | 1 | 1 day |
//! | intraday | 2-7 | 3 months |
//! | daily or coarser | 8-10 | 5 years |
//!
//! Month and year steps use calendar arithmetic. When the target month is
//! shorter than the start day, the step lands on the last day of that month
//! (Jan 31 + 1 month = Feb 28/29).

use crate::{DateInterval, Granularity, GranularityClass};
use chrono::{Days, Months, NaiveDate};

/// Maximum span of one request for a granularity class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxSpan {
    /// A number of days
    Days(u64),
    /// A number of calendar months
    Months(u32),
}

impl MaxSpan {
    /// Span limit for the given class
    pub fn for_class(class: GranularityClass) -> Self {
        match class {
            GranularityClass::Tick => MaxSpan::Days(1),
            GranularityClass::Intraday => MaxSpan::Months(3),
            GranularityClass::DailyOrCoarser => MaxSpan::Months(5 * 12),
        }
    }

    /// Advance `date` by this span, `None` past the end of the calendar
    pub fn advance(&self, date: NaiveDate) -> Option<NaiveDate> {
        match *self {
            MaxSpan::Days(days) => date.checked_add_days(Days::new(days)),
            MaxSpan::Months(months) => date.checked_add_months(Months::new(months)),
        }
    }
}

/// Split `interval` into contiguous chunks no longer than the span limit of `granularity`
///
/// Always returns at least one chunk. Consecutive chunks share their boundary
/// day (`chunks[i].end() == chunks[i + 1].start()`), the first chunk starts at
/// `interval.start()` and the last one ends at `interval.end()`.
pub fn chunk(interval: &DateInterval, granularity: Granularity) -> Vec<DateInterval> {
    let span = MaxSpan::for_class(granularity.class());
    let mut chunks = Vec::new();
    let mut current = interval.start;

    loop {
        match span.advance(current) {
            Some(next) if next < interval.end => {
                chunks.push(DateInterval {
                    start: current,
                    end: next,
                });
                current = next;
            }
            _ => {
                chunks.push(DateInterval {
                    start: current,
                    end: interval.end,
                });
                break;
            }
        }
    }

    chunks
}
