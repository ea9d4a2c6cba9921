//! Schedule parsing and conflict detection.
//!
//! A time specification is either `HH:MM` or `Day HH:MM` with a three-letter
//! day token. Parsing is strict and reports every other shape as an error;
//! the fail-open policy (unparseable or missing schedules never conflict) is
//! applied by [`conflicts`], not by the parser.

use chrono::Weekday;
use thiserror::Error;

use crate::domain::course::Course;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ScheduleParseError {
    #[error("schedule is missing a start or end time")]
    Missing,
    #[error("unrecognized time specification `{0}`")]
    Malformed(String),
    #[error("unknown day token `{0}`")]
    UnknownDay(String),
    #[error("time `{0}` is out of range")]
    OutOfRange(String),
    #[error("schedule ends at or before it starts")]
    EmptyInterval,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeSpec {
    pub day: Option<Weekday>,
    pub minute_of_day: u16,
}

/// Half-open interval `[start, end)` on an optional day.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schedule {
    pub day: Option<Weekday>,
    pub start: u16,
    pub end: u16,
}

pub fn parse_time_spec(raw: &str) -> Result<TimeSpec, ScheduleParseError> {
    let tokens = raw.split_whitespace().collect::<Vec<_>>();
    let (day, clock) = match tokens.as_slice() {
        [clock] => (None, *clock),
        [day, clock] => (Some(parse_day(day)?), *clock),
        _ => return Err(ScheduleParseError::Malformed(raw.to_string())),
    };

    Ok(TimeSpec { day, minute_of_day: parse_clock(clock)? })
}

fn parse_day(token: &str) -> Result<Weekday, ScheduleParseError> {
    let day = match token.to_ascii_lowercase().as_str() {
        "mon" => Weekday::Mon,
        "tue" => Weekday::Tue,
        "wed" => Weekday::Wed,
        "thu" => Weekday::Thu,
        "fri" => Weekday::Fri,
        "sat" => Weekday::Sat,
        "sun" => Weekday::Sun,
        _ => return Err(ScheduleParseError::UnknownDay(token.to_string())),
    };
    Ok(day)
}

fn parse_clock(token: &str) -> Result<u16, ScheduleParseError> {
    let malformed = || ScheduleParseError::Malformed(token.to_string());
    let (hour, minute) = token.split_once(':').ok_or_else(malformed)?;

    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !digits(hour) || hour.len() > 2 || !digits(minute) || minute.len() != 2 {
        return Err(malformed());
    }

    let hour = hour.parse::<u16>().map_err(|_| malformed())?;
    let minute = minute.parse::<u16>().map_err(|_| malformed())?;
    if hour >= 24 || minute >= 60 {
        return Err(ScheduleParseError::OutOfRange(token.to_string()));
    }

    Ok(hour * 60 + minute)
}

pub fn parse_schedule(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Schedule, ScheduleParseError> {
    let (Some(start), Some(end)) = (start, end) else {
        return Err(ScheduleParseError::Missing);
    };
    let start = parse_time_spec(start)?;
    let end = parse_time_spec(end)?;

    if end.minute_of_day <= start.minute_of_day {
        return Err(ScheduleParseError::EmptyInterval);
    }

    Ok(Schedule {
        day: start.day.or(end.day),
        start: start.minute_of_day,
        end: end.minute_of_day,
    })
}

pub fn course_schedule(course: &Course) -> Result<Schedule, ScheduleParseError> {
    parse_schedule(course.schedule_start.as_deref(), course.schedule_end.as_deref())
}

/// Days are compared only when both schedules name one; a dayless schedule
/// is compared on minutes alone.
pub fn overlaps(a: &Schedule, b: &Schedule) -> bool {
    if let (Some(day_a), Some(day_b)) = (a.day, b.day) {
        if day_a != day_b {
            return false;
        }
    }
    a.start < b.end && a.end > b.start
}

/// Fail-open: a missing or unparseable schedule on either course is no conflict.
pub fn conflicts(a: &Course, b: &Course) -> bool {
    match (course_schedule(a), course_schedule(b)) {
        (Ok(left), Ok(right)) => overlaps(&left, &right),
        _ => false,
    }
}

pub fn is_available(candidate: &Course, enrolled: &[Course]) -> bool {
    !enrolled.iter().any(|course| course.id == candidate.id || conflicts(candidate, course))
}
