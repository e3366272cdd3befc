use std::fmt;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};

/// A calendar-month window. The window is half-open: `start()` is inside the
/// period, `next_start()` is the first instant of the following period and is
/// excluded. Doubles as the alert-ledger key via `key()` ("YYYY-MM").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The period the server clock is currently in.
    pub fn current_local() -> Self {
        Self::containing(Local::now().date_naive())
    }

    pub fn start(&self) -> NaiveDateTime {
        first_instant(self.year, self.month)
    }

    pub fn next_start(&self) -> NaiveDateTime {
        if self.month == 12 {
            first_instant(self.year + 1, 1)
        } else {
            first_instant(self.year, self.month + 1)
        }
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at >= self.start() && at < self.next_start()
    }

    /// Ledger key, sortable as text ("2026-08").
    pub fn key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    pub fn months_back(&self, months: u32) -> Self {
        let total = self.year * 12 + (self.month as i32 - 1) - months as i32;
        Self {
            year: total.div_euclid(12),
            month: (total.rem_euclid(12) + 1) as u32,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

fn first_instant(year: i32, month: u32) -> NaiveDateTime {
    // month is always 1..=12 here; from_ymd_opt only fails on years far
    // outside anything a finance record can carry.
    NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN)
}
