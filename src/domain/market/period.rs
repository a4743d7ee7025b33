use anyhow::{Result, anyhow};
use chrono::{Datelike, Duration, Months, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// Look-back span for a history request, in yfinance notation
/// (`60d`, `2wk`, `6mo`, `5y`, `ytd`, `max`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Days(u32),
    Weeks(u32),
    Months(u32),
    Years(u32),
    YearToDate,
    Max,
}

impl Period {
    /// First calendar day covered when the period ends on `end`.
    /// `None` means unbounded.
    pub fn start_from(&self, end: NaiveDate) -> Option<NaiveDate> {
        match *self {
            Period::Days(n) => end.checked_sub_signed(Duration::days(i64::from(n))),
            Period::Weeks(n) => end.checked_sub_signed(Duration::weeks(i64::from(n))),
            Period::Months(n) => end.checked_sub_months(Months::new(n)),
            Period::Years(n) => end.checked_sub_months(Months::new(n.saturating_mul(12))),
            Period::YearToDate => NaiveDate::from_ymd_opt(end.year(), 1, 1),
            Period::Max => None,
        }
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_lowercase();
        match raw.as_str() {
            "ytd" => return Ok(Period::YearToDate),
            "max" => return Ok(Period::Max),
            _ => {}
        }

        let split = raw
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| anyhow!("Invalid period: {}. Missing unit (d, wk, mo, y)", s))?;
        let (count, unit) = raw.split_at(split);
        let count: u32 = count
            .parse()
            .map_err(|_| anyhow!("Invalid period: {}. Expected a leading count", s))?;
        if count == 0 {
            return Err(anyhow!("Invalid period: {}. Count must be positive", s));
        }

        match unit {
            "d" => Ok(Period::Days(count)),
            "wk" => Ok(Period::Weeks(count)),
            "mo" => Ok(Period::Months(count)),
            "y" => Ok(Period::Years(count)),
            _ => Err(anyhow!(
                "Invalid period: {}. Must look like 60d, 2wk, 6mo, 5y, ytd or max",
                s
            )),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Days(n) => write!(f, "{}d", n),
            Period::Weeks(n) => write!(f, "{}wk", n),
            Period::Months(n) => write!(f, "{}mo", n),
            Period::Years(n) => write!(f, "{}y", n),
            Period::YearToDate => write!(f, "ytd"),
            Period::Max => write!(f, "max"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_yfinance_periods() {
        assert_eq!("60d".parse::<Period>().unwrap(), Period::Days(60));
        assert_eq!("2wk".parse::<Period>().unwrap(), Period::Weeks(2));
        assert_eq!("6mo".parse::<Period>().unwrap(), Period::Months(6));
        assert_eq!("5Y".parse::<Period>().unwrap(), Period::Years(5));
        assert_eq!(" ytd ".parse::<Period>().unwrap(), Period::YearToDate);
        assert_eq!("max".parse::<Period>().unwrap(), Period::Max);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Period>().is_err());
        assert!("60".parse::<Period>().is_err());
        assert!("0d".parse::<Period>().is_err());
        assert!("1h".parse::<Period>().is_err());
        assert!("y".parse::<Period>().is_err());
    }

    #[test]
    fn test_display_matches_parse() {
        for raw in ["1d", "3wk", "1mo", "10y", "ytd", "max"] {
            assert_eq!(raw.parse::<Period>().unwrap().to_string(), raw);
        }
    }

    #[test]
    fn test_start_from() {
        let end = date(2024, 3, 31);
        assert_eq!(Period::Days(60).start_from(end), Some(date(2024, 1, 31)));
        assert_eq!(Period::Weeks(1).start_from(end), Some(date(2024, 3, 24)));
        assert_eq!(Period::Months(1).start_from(end), Some(date(2024, 2, 29)));
        assert_eq!(Period::Years(1).start_from(end), Some(date(2023, 3, 31)));
        assert_eq!(Period::YearToDate.start_from(end), Some(date(2024, 1, 1)));
        assert_eq!(Period::Max.start_from(end), None);
    }
}
