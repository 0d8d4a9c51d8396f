//! Repeat days of an alarm

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Days of the week in wire order, Monday first.
pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

const ALL_DAYS: u8 = 0b0111_1111;

/// Set of weekdays an alarm repeats on, stored as a 7-bit mask (Monday = bit 0)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DaysOfWeek(u8);

impl DaysOfWeek {
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn all() -> Self {
        Self(ALL_DAYS)
    }

    /// Build from a stored mask; bits above Sunday are dropped
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & ALL_DAYS)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn contains(self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    pub fn set(&mut self, day: Weekday, enabled: bool) {
        if enabled {
            self.0 |= Self::bit(day);
        } else {
            self.0 &= !Self::bit(day);
        }
    }

    #[must_use]
    pub fn with(mut self, day: Weekday) -> Self {
        self.set(day, true);
        self
    }

    /// Whether the alarm repeats at all
    #[must_use]
    pub const fn is_repeating(self) -> bool {
        self.0 != 0
    }

    /// Enabled days in Monday-first order
    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        WEEK.into_iter().filter(move |day| self.contains(*day))
    }

    fn bit(day: Weekday) -> u8 {
        1 << day.num_days_from_monday()
    }
}

impl FromIterator<Weekday> for DaysOfWeek {
    fn from_iter<T: IntoIterator<Item = Weekday>>(iter: T) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl fmt::Display for DaysOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_repeating() {
            return f.write_str("once");
        }
        if *self == Self::all() {
            return f.write_str("daily");
        }
        let names = self
            .iter()
            .map(|day| day.to_string().to_lowercase())
            .collect::<Vec<_>>();
        f.write_str(&names.join(","))
    }
}

impl FromStr for DaysOfWeek {
    type Err = Error;

    /// Parse `mon,tue,...` (short or full names), `daily`, `weekdays`,
    /// `weekends`, or `once`/empty for no repeat.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        match value.as_str() {
            "" | "once" | "never" => return Ok(Self::empty()),
            "daily" | "all" => return Ok(Self::all()),
            "weekdays" => return Ok(WEEK[..5].iter().copied().collect()),
            "weekends" => return Ok(WEEK[5..].iter().copied().collect()),
            _ => {}
        }

        value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<Weekday>()
                    .map_err(|_| Error::InvalidInput(format!("unknown weekday '{part}'")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_contains() {
        let mut days = DaysOfWeek::empty();
        days.set(Weekday::Wed, true);
        days.set(Weekday::Sun, true);
        assert!(days.contains(Weekday::Wed));
        assert!(days.contains(Weekday::Sun));
        assert!(!days.contains(Weekday::Mon));

        days.set(Weekday::Wed, false);
        assert!(!days.contains(Weekday::Wed));
        assert_eq!(days.bits(), 0b0100_0000);
    }

    #[test]
    fn test_order_independent() {
        let a: DaysOfWeek = [Weekday::Fri, Weekday::Mon].into_iter().collect();
        let b: DaysOfWeek = [Weekday::Mon, Weekday::Fri, Weekday::Mon].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_names() {
        let days: DaysOfWeek = "mon, Wednesday,FRI".parse().unwrap();
        assert_eq!(
            days.iter().collect::<Vec<_>>(),
            vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]
        );
        assert_eq!("weekdays".parse::<DaysOfWeek>().unwrap().bits(), 0b0001_1111);
        assert_eq!("daily".parse::<DaysOfWeek>().unwrap(), DaysOfWeek::all());
        assert_eq!("".parse::<DaysOfWeek>().unwrap(), DaysOfWeek::empty());
        assert!("mon,someday".parse::<DaysOfWeek>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(DaysOfWeek::empty().to_string(), "once");
        assert_eq!(DaysOfWeek::all().to_string(), "daily");
        let days: DaysOfWeek = "sat,sun".parse().unwrap();
        assert_eq!(days.to_string(), "sat,sun");
    }

    #[test]
    fn test_from_bits_masks_high_bit() {
        assert_eq!(DaysOfWeek::from_bits(0xff), DaysOfWeek::all());
    }
}
