use chrono::{Datelike, Days, NaiveDate};

/// One calendar month queried against the dataset, rendered as `%Y-%m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    first_day: NaiveDate,
}

impl MonthWindow {
    /// The month containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        let first_day = date.with_day(1).unwrap_or(date);
        Self { first_day }
    }

    /// The month immediately before this one.
    pub fn previous(self) -> Self {
        let last_of_previous = self
            .first_day
            .checked_sub_days(Days::new(1))
            .unwrap_or(self.first_day);
        Self::containing(last_of_previous)
    }

    pub fn label(&self) -> String {
        self.first_day.format("%Y-%m").to_string()
    }
}

impl std::fmt::Display for MonthWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Windows to try in order: the current month, then the previous one.
pub fn candidate_windows(today: NaiveDate) -> Vec<MonthWindow> {
    let current = MonthWindow::containing(today);
    vec![current, current.previous()]
}
