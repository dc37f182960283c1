use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::dates::{self, wall_clock};
use super::error::ModelError;
use super::fields::{
    validate_text, BaseFields, DetailFields, ImageFields, NameFields, OverrideFields,
};
use super::item::{Entity, ItemType};

/// Top of the hierarchy. Years have no parent; children are semesters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Year {
    #[serde(flatten)]
    pub base: BaseFields,
    #[serde(flatten)]
    pub name: NameFields,
    #[serde(flatten)]
    pub details: DetailFields,
    #[serde(flatten)]
    pub images: ImageFields,
    #[serde(flatten)]
    pub overrides: OverrideFields,
}

impl Year {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: BaseFields::new(Uuid::nil()),
            name: NameFields::new(name),
            ..Self::default()
        }
    }
}

impl Entity for Year {
    fn item_type(&self) -> ItemType {
        ItemType::Year
    }

    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseFields {
        &mut self.base
    }

    fn validate(&self) -> Result<(), ModelError> {
        validate_text(&self.name, &self.details, &self.images)
    }
}

/// Semesters sit under a year and never move to another one.
///
/// Children are classes, tasks and semester-level mega items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Semester {
    #[serde(flatten)]
    pub base: BaseFields,
    #[serde(flatten)]
    pub name: NameFields,
    #[serde(flatten)]
    pub details: DetailFields,
    #[serde(flatten)]
    pub images: ImageFields,
    #[serde(flatten)]
    pub overrides: OverrideFields,
    /// Unassigned by default.
    #[serde(with = "wall_clock", default = "dates::unassigned")]
    pub start: DateTime<Utc>,
    #[serde(with = "wall_clock", default = "dates::unassigned")]
    pub end: DateTime<Utc>,
}

impl Semester {
    pub fn new(year_identifier: Uuid, name: impl Into<String>) -> Self {
        Self {
            base: BaseFields::new(year_identifier),
            name: NameFields::new(name),
            ..Self::default()
        }
    }

    pub fn with_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// True when both bounds are set and `date` falls inside them (inclusive).
    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        !dates::is_unassigned(self.start)
            && !dates::is_unassigned(self.end)
            && self.start <= date
            && date <= self.end
    }
}

impl Default for Semester {
    fn default() -> Self {
        Self {
            base: BaseFields::default(),
            name: NameFields::default(),
            details: DetailFields::default(),
            images: ImageFields::default(),
            overrides: OverrideFields::default(),
            start: dates::unassigned(),
            end: dates::unassigned(),
        }
    }
}

impl Entity for Semester {
    fn item_type(&self) -> ItemType {
        ItemType::Semester
    }

    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseFields {
        &mut self.base
    }

    fn validate(&self) -> Result<(), ModelError> {
        validate_text(&self.name, &self.details, &self.images)
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name.name)?;
        if !dates::is_unassigned(self.start) && !dates::is_unassigned(self.end) {
            write!(
                f,
                " ({} - {})",
                self.start.date_naive(),
                self.end.date_naive()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fields::UNGRADED;
    use chrono::TimeZone;

    #[test]
    fn test_year_new() {
        let year = Year::new("Freshman");
        assert_eq!(year.name.name, "Freshman");
        assert!(year.base.upper_identifier().is_nil());
        assert!(!year.base.identifier().is_nil());
        assert_eq!(year.overrides.overridden_gpa, UNGRADED);
        assert_eq!(year.level(), 0);
    }

    #[test]
    fn test_semester_defaults() {
        let year = Year::new("Freshman");
        let semester = Semester::new(year.identifier(), "Fall");
        assert_eq!(semester.upper_identifier(), year.identifier());
        assert_eq!(semester.start, dates::unassigned());
        assert_eq!(semester.end, dates::unassigned());
        assert_eq!(semester.level(), 1);
    }

    #[test]
    fn test_semester_contains() {
        let start = Utc.with_ymd_and_hms(2024, 8, 26, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 12, 20, 0, 0, 0).unwrap();
        let semester = Semester::new(Uuid::new_v4(), "Fall").with_range(start, end);

        assert!(semester.contains(Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap()));
        assert!(!semester.contains(Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap()));
        assert!(!Semester::new(Uuid::new_v4(), "Open").contains(start));
    }

    #[test]
    fn test_semester_display() {
        let start = Utc.with_ymd_and_hms(2024, 8, 26, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 12, 20, 0, 0, 0).unwrap();
        let semester = Semester::new(Uuid::new_v4(), "Fall").with_range(start, end);
        assert_eq!(semester.to_string(), "Fall (2024-08-26 - 2024-12-20)");
    }

    #[test]
    fn test_semester_json_roundtrip() {
        let semester = Semester::new(Uuid::new_v4(), "Spring");
        let json = serde_json::to_string(&semester).unwrap();
        assert!(json.contains("\"Start\":\"1970-01-01T00:00:00Z\""));
        assert!(json.contains("\"OverriddenGPA\":-50.0"));

        let parsed: Semester = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, semester);
    }
}
