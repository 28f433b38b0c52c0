use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Calendar date value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Date(NaiveDate);

impl Date {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Date> {
        NaiveDate::from_ymd_opt(year, month, day).map(Date)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for Date {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Date, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Date)
    }
}

/// Date and time-of-day value, millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    pub fn now() -> Timestamp {
        Timestamp(chrono::Utc::now().naive_utc())
    }

    pub fn date(&self) -> Date {
        Date(self.0.date())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = self.0.nanosecond() / 1_000_000;
        write!(f, "{}.{:03}", self.0.format("%Y-%m-%d %H:%M:%S"), millis)
    }
}

impl FromStr for Timestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Timestamp, Self::Err> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").map(Timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_order() {
        let d1: Date = "2023-04-01".parse().unwrap();
        let d2: Date = "2023-04-02".parse().unwrap();
        assert!(d1 < d2);
        assert_eq!(d1.to_string(), "2023-04-01");

        let t1: Timestamp = "2023-04-01 10:30:00.250".parse().unwrap();
        let t2: Timestamp = "2023-04-01 10:30:01".parse().unwrap();
        assert!(t1 < t2);
        assert_eq!(t1.to_string(), "2023-04-01 10:30:00.250");
        assert_eq!(t1.date(), d1);
    }
}
