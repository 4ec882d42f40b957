use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// First month of a school year. June..December of year Y belong to `Y-(Y+1)`.
pub const ROLLOVER_MONTH: u32 = 6;

/// Leave-credit accounting period, written `"YYYY-YYYY"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchoolYear {
    start: i32,
}

impl SchoolYear {
    pub fn starting(start: i32) -> Self {
        Self { start }
    }

    /// School year a calendar date falls in.
    pub fn containing(date: NaiveDate) -> Self {
        if date.month() >= ROLLOVER_MONTH {
            Self::starting(date.year())
        } else {
            Self::starting(date.year() - 1)
        }
    }

    pub fn start_year(&self) -> i32 {
        self.start
    }

    pub fn end_year(&self) -> i32 {
        self.start + 1
    }

    pub fn previous(&self) -> Self {
        Self::starting(self.start - 1)
    }

    pub fn next(&self) -> Self {
        Self::starting(self.start + 1)
    }
}

impl fmt::Display for SchoolYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:04}", self.start, self.end_year())
    }
}

impl FromStr for SchoolYear {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::validation(format!("school year must look like YYYY-YYYY, got '{s}'"));

        let (first, second) = s.trim().split_once('-').ok_or_else(invalid)?;
        let four_digits =
            |part: &str| part.len() == 4 && part.bytes().all(|b| b.is_ascii_digit());
        if !four_digits(first) || !four_digits(second) {
            return Err(invalid());
        }

        let start: i32 = first.parse().map_err(|_| invalid())?;
        let end: i32 = second.parse().map_err(|_| invalid())?;

        if end != start + 1 {
            return Err(AppError::validation(format!(
                "school year '{s}' must span two consecutive years"
            )));
        }

        Ok(Self::starting(start))
    }
}

impl TryFrom<String> for SchoolYear {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SchoolYear> for String {
    fn from(year: SchoolYear) -> Self {
        year.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_prints_canonical_form() {
        let year: SchoolYear = "2024-2025".parse().unwrap();
        assert_eq!(year.start_year(), 2024);
        assert_eq!(year.to_string(), "2024-2025");
        assert_eq!(year.previous().to_string(), "2023-2024");
        assert_eq!(year.next().to_string(), "2025-2026");
    }

    #[test]
    fn rejects_malformed_years() {
        for bad in [
            "2024",
            "2024-2026",
            "24-25",
            "abcd-efgh",
            "2025-2024",
            "",
            "+999-1000",
            "2024-+025",
        ] {
            assert!(
                matches!(bad.parse::<SchoolYear>(), Err(AppError::Validation(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn june_starts_a_new_school_year() {
        let may = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();
        let june = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(SchoolYear::containing(may).to_string(), "2024-2025");
        assert_eq!(SchoolYear::containing(june).to_string(), "2025-2026");
    }

    #[test]
    fn serde_uses_string_form() {
        let year = SchoolYear::starting(2030);
        let json = serde_json::to_string(&year).unwrap();
        assert_eq!(json, "\"2030-2031\"");
        let back: SchoolYear = serde_json::from_str(&json).unwrap();
        assert_eq!(back, year);
        assert!(serde_json::from_str::<SchoolYear>("\"2030-2035\"").is_err());
    }
}
