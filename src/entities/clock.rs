use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{invalid_input_error, Error};

/// Wall-clock time of day, written as `HH:MM`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(NaiveTime);

impl ClockTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self, Error> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or_else(invalid_input_error)
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    /// Night runs from 22:00 up to but excluding 06:00.
    pub fn is_night(&self) -> bool {
        self.hour() >= 22 || self.hour() < 6
    }
}

impl FromStr for ClockTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self)
            .map_err(|_| invalid_input_error())
    }
}

impl TryFrom<String> for ClockTime {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(time: ClockTime) -> Self {
        time.to_string()
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

#[test]
fn night_boundaries() {
    let night = |s: &str| s.parse::<ClockTime>().unwrap().is_night();

    assert!(!night("21:59"));
    assert!(night("22:00"));
    assert!(night("05:59"));
    assert!(!night("06:00"));
    assert!(night("00:00"));
    assert!(!night("12:30"));
}

#[test]
fn parses_and_prints_hh_mm() {
    let time: ClockTime = "7:05".parse().unwrap();
    assert_eq!(time.to_string(), "07:05");

    assert!("24:00".parse::<ClockTime>().is_err());
    assert!("noon".parse::<ClockTime>().is_err());

    let json = serde_json::to_string(&ClockTime::new(22, 15).unwrap()).unwrap();
    assert_eq!(json, "\"22:15\"");
    let back: ClockTime = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ClockTime::new(22, 15).unwrap());
}
