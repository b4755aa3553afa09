use crate::core::{Result, SchemaError};
use chrono::{Days, Months, NaiveDate};
use regex::Regex;
use std::str::FromStr;

lazy_static::lazy_static! {
    static ref RELATIVE_DATE: Regex =
        Regex::new(r"^([+-]?\d+)-(day|week|month|year)s?$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateUnit {
    Day,
    Week,
    Month,
    Year,
}

/// Date bound relative to the reference date, written `<±N>-<unit>`
/// (`-1-year`, `+2-weeks`, `30-day`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeDate {
    pub amount: i64,
    pub unit: DateUnit,
}

impl FromStr for RelativeDate {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || {
            SchemaError::InvalidConfiguration(format!(
                "Malformed relative date '{}', expected <±N>-<day|week|month|year>",
                s
            ))
        };

        let caps = RELATIVE_DATE.captures(s.trim()).ok_or_else(malformed)?;
        let amount = caps[1].parse::<i64>().map_err(|_| malformed())?;
        let unit = match &caps[2] {
            "day" => DateUnit::Day,
            "week" => DateUnit::Week,
            "month" => DateUnit::Month,
            "year" => DateUnit::Year,
            _ => return Err(malformed()),
        };

        Ok(Self { amount, unit })
    }
}

impl RelativeDate {
    /// `today` shifted by the amount; month and year steps clamp to the
    /// last day of the target month.
    pub fn resolve(&self, today: NaiveDate) -> Result<NaiveDate> {
        let magnitude = self.amount.unsigned_abs();
        let forward = self.amount >= 0;

        let shifted = match self.unit {
            DateUnit::Day | DateUnit::Week => {
                let days = if self.unit == DateUnit::Week {
                    magnitude.checked_mul(7)
                } else {
                    Some(magnitude)
                };
                days.map(Days::new).and_then(|days| {
                    if forward {
                        today.checked_add_days(days)
                    } else {
                        today.checked_sub_days(days)
                    }
                })
            }
            DateUnit::Month | DateUnit::Year => {
                let months = if self.unit == DateUnit::Year {
                    magnitude.checked_mul(12)
                } else {
                    Some(magnitude)
                };
                months
                    .and_then(|m| u32::try_from(m).ok())
                    .map(Months::new)
                    .and_then(|months| {
                        if forward {
                            today.checked_add_months(months)
                        } else {
                            today.checked_sub_months(months)
                        }
                    })
            }
        };

        shifted.ok_or_else(|| {
            SchemaError::InvalidConfiguration(format!(
                "Relative date {:?} {} out of range from {}",
                self.unit, self.amount, today
            ))
        })
    }
}
