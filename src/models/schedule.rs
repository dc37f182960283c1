use chrono::{DateTime, NaiveDate, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dates::{self, wall_clock};
use super::error::ModelError;
use super::fields::{validate_text, BaseFields, DetailFields, ImageFields, NameFields, MAX_NAME_LENGTH};
use super::item::{Entity, ItemType};

/// Week of a two-week rotating schedule a time slot occurs on. Encoded as bit flags
/// (`01`, `10`, `11`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleWeek {
    WeekOne = 1,
    WeekTwo = 2,
    /// Same slot every week.
    #[default]
    BothWeeks = 3,
}

impl ScheduleWeek {
    /// Whether a slot scheduled for `self` happens during `week`.
    pub fn includes(self, week: ScheduleWeek) -> bool {
        (self as u8) & (week as u8) != 0
    }

    /// Which week `date` falls on when week one starts on `week_one_starts_on`.
    ///
    /// Only the date parts matter. The anchor may lie after `date`; counting then runs
    /// backwards so the week before the anchor is week two.
    pub fn for_date(week_one_starts_on: NaiveDate, date: NaiveDate) -> ScheduleWeek {
        let days = if date >= week_one_starts_on {
            (date - week_one_starts_on).num_days()
        } else {
            (week_one_starts_on - date).num_days() + 6
        };

        if (days / 7) % 2 == 0 {
            ScheduleWeek::WeekOne
        } else {
            ScheduleWeek::WeekTwo
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleType {
    /// A lecture or regular meeting.
    #[default]
    Normal,
    OfficeHours,
    /// Lab or discussion section.
    Lab,
}

/// A recurring weekly time slot of a class. Schedules never move to another class.
///
/// Only the time components of `start_time` and `end_time` matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Schedule {
    #[serde(flatten)]
    pub base: BaseFields,
    #[serde(flatten)]
    pub name: NameFields,
    #[serde(flatten)]
    pub details: DetailFields,
    #[serde(flatten)]
    pub images: ImageFields,
    #[serde(default = "monday")]
    pub day_of_week: Weekday,
    #[serde(with = "wall_clock", default = "dates::unassigned")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "wall_clock", default = "dates::unassigned")]
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub schedule_week: ScheduleWeek,
    #[serde(default)]
    pub schedule_type: ScheduleType,
    #[serde(default)]
    pub location_latitude: f64,
    #[serde(default)]
    pub location_longitude: f64,
}

fn monday() -> Weekday {
    Weekday::Mon
}

impl Schedule {
    pub fn new(
        class_identifier: Uuid,
        day_of_week: Weekday,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            base: BaseFields::new(class_identifier),
            day_of_week,
            start_time,
            end_time,
            ..Self::default()
        }
    }

    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = room.into();
        self
    }

    pub fn with_week(mut self, schedule_week: ScheduleWeek) -> Self {
        self.schedule_week = schedule_week;
        self
    }

    pub fn with_type(mut self, schedule_type: ScheduleType) -> Self {
        self.schedule_type = schedule_type;
        self
    }

    /// Whether the slot runs on `date` given the anchor of the two-week rotation.
    pub fn occurs_on(&self, week_one_starts_on: NaiveDate, date: NaiveDate) -> bool {
        use chrono::Datelike;

        date.weekday() == self.day_of_week
            && self
                .schedule_week
                .includes(ScheduleWeek::for_date(week_one_starts_on, date))
    }

    /// Minutes since midnight of start and end.
    pub fn minutes(&self) -> (u32, u32) {
        let of = |t: &DateTime<Utc>| t.hour() * 60 + t.minute();
        (of(&self.start_time), of(&self.end_time))
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            base: BaseFields::default(),
            name: NameFields::default(),
            details: DetailFields::default(),
            images: ImageFields::default(),
            day_of_week: Weekday::Mon,
            start_time: dates::unassigned(),
            end_time: dates::unassigned(),
            room: String::new(),
            schedule_week: ScheduleWeek::BothWeeks,
            schedule_type: ScheduleType::Normal,
            location_latitude: 0.0,
            location_longitude: 0.0,
        }
    }
}

impl Entity for Schedule {
    fn item_type(&self) -> ItemType {
        ItemType::Schedule
    }

    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseFields {
        &mut self.base
    }

    fn validate(&self) -> Result<(), ModelError> {
        validate_text(&self.name, &self.details, &self.images)?;
        let room_length = self.room.chars().count();
        if room_length > MAX_NAME_LENGTH {
            return Err(ModelError::NameTooLong(room_length));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_for_date_after_anchor() {
        let anchor = day(2024, 9, 2);
        assert_eq!(ScheduleWeek::for_date(anchor, day(2024, 9, 2)), ScheduleWeek::WeekOne);
        assert_eq!(ScheduleWeek::for_date(anchor, day(2024, 9, 8)), ScheduleWeek::WeekOne);
        assert_eq!(ScheduleWeek::for_date(anchor, day(2024, 9, 9)), ScheduleWeek::WeekTwo);
        assert_eq!(ScheduleWeek::for_date(anchor, day(2024, 9, 16)), ScheduleWeek::WeekOne);
    }

    #[test]
    fn test_week_for_date_before_anchor() {
        let anchor = day(2014, 1, 7);
        // The day before the anchor belongs to the previous week, week two.
        assert_eq!(ScheduleWeek::for_date(anchor, day(2014, 1, 6)), ScheduleWeek::WeekTwo);
        assert_eq!(ScheduleWeek::for_date(anchor, day(2013, 12, 31)), ScheduleWeek::WeekTwo);
        assert_eq!(ScheduleWeek::for_date(anchor, day(2013, 12, 30)), ScheduleWeek::WeekOne);
    }

    #[test]
    fn test_week_includes() {
        assert!(ScheduleWeek::BothWeeks.includes(ScheduleWeek::WeekOne));
        assert!(ScheduleWeek::BothWeeks.includes(ScheduleWeek::WeekTwo));
        assert!(!ScheduleWeek::WeekOne.includes(ScheduleWeek::WeekTwo));
    }

    #[test]
    fn test_occurs_on() {
        let start = Utc.with_ymd_and_hms(1970, 1, 1, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(1970, 1, 1, 9, 50, 0).unwrap();
        let lab = Schedule::new(Uuid::new_v4(), Weekday::Tue, start, end)
            .with_week(ScheduleWeek::WeekTwo)
            .with_type(ScheduleType::Lab);

        let anchor = day(2024, 9, 2);
        assert!(!lab.occurs_on(anchor, day(2024, 9, 3)));
        assert!(lab.occurs_on(anchor, day(2024, 9, 10)));
        assert!(!lab.occurs_on(anchor, day(2024, 9, 11)));
        assert_eq!(lab.minutes(), (540, 590));
    }

    #[test]
    fn test_schedule_json_roundtrip() {
        let start = Utc.with_ymd_and_hms(1970, 1, 1, 13, 30, 0).unwrap();
        let schedule = Schedule::new(Uuid::new_v4(), Weekday::Fri, start, start)
            .with_room("Gould Simpson 901");
        let json = serde_json::to_string(&schedule).unwrap();
        let parsed: Schedule = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, schedule);
        assert_eq!(parsed.level(), 3);
    }
}
