use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::dates::{self, wall_clock};
use super::error::ModelError;
use super::fields::{
    validate_text, BaseFields, DetailFields, ImageFields, NameFields, NO_CREDITS, UNGRADED,
};
use super::grade_scale::GradeScale;
use super::item::{Entity, ItemType};

pub const DEFAULT_CLASS_COLOR: &str = "#1BA1E2";

/// Passing grade of pass/fail classes, as a fraction.
pub const DEFAULT_PASSING_GRADE: f64 = 0.6;

/// How a class contributes to the overall GPA.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpaType {
    /// Both credits and GPA count.
    #[default]
    Standard,
    /// GPA is ignored; credits count only when passed.
    PassFail,
}

/// A class sits under a semester and may move to another semester; its children move
/// with it since only the class' parent changes.
///
/// Children are homework, exams, schedules, weight categories and attribute/subject
/// links. A class must always keep at least one weight category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Class {
    #[serde(flatten)]
    pub base: BaseFields,
    #[serde(flatten)]
    pub name: NameFields,
    #[serde(flatten)]
    pub details: DetailFields,
    #[serde(flatten)]
    pub images: ImageFields,
    /// e.g. "127A"
    #[serde(default)]
    pub course_number: String,
    #[serde(default = "no_credits")]
    pub credits: f64,
    #[serde(default)]
    pub should_average_grade_totals: bool,
    #[serde(default = "rounds_up")]
    pub does_round_grades_up: bool,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub position: u8,
    #[serde(default)]
    pub gpa_type: GpaType,
    #[serde(default = "default_passing_grade")]
    pub passing_grade: f64,
    /// `None` means the traditional scale.
    #[serde(default)]
    pub grade_scales: Option<Vec<GradeScale>>,
    #[serde(rename = "OverriddenGPA", default = "ungraded")]
    pub overridden_gpa: f64,
    #[serde(default = "ungraded")]
    pub overridden_grade: f64,
    /// Minimum persisted date means "from the start of the semester".
    #[serde(with = "wall_clock", default = "dates::min_persisted")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "wall_clock", default = "dates::min_persisted")]
    pub end_date: DateTime<Utc>,
}

fn no_credits() -> f64 {
    NO_CREDITS
}

fn rounds_up() -> bool {
    true
}

fn default_color() -> String {
    DEFAULT_CLASS_COLOR.to_string()
}

fn default_passing_grade() -> f64 {
    DEFAULT_PASSING_GRADE
}

fn ungraded() -> f64 {
    UNGRADED
}

impl Class {
    pub fn new(semester_identifier: Uuid, name: impl Into<String>) -> Self {
        Self {
            base: BaseFields::new(semester_identifier),
            name: NameFields::new(name),
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_credits(mut self, credits: f64) -> Self {
        self.credits = credits;
        self
    }

    pub fn with_course_number(mut self, course_number: impl Into<String>) -> Self {
        self.course_number = course_number.into();
        self
    }

    pub fn with_grade_scales(mut self, grade_scales: Vec<GradeScale>) -> Self {
        self.grade_scales = Some(grade_scales);
        self
    }

    pub fn has_credits(&self) -> bool {
        self.credits != NO_CREDITS
    }

    /// The class' own scale, or the traditional one when none is set.
    pub fn effective_grade_scales(&self) -> Vec<GradeScale> {
        self.grade_scales
            .clone()
            .unwrap_or_else(GradeScale::default_scale)
    }
}

impl Default for Class {
    fn default() -> Self {
        Self {
            base: BaseFields::default(),
            name: NameFields::default(),
            details: DetailFields::default(),
            images: ImageFields::default(),
            course_number: String::new(),
            credits: NO_CREDITS,
            should_average_grade_totals: false,
            does_round_grades_up: true,
            color: default_color(),
            position: 0,
            gpa_type: GpaType::Standard,
            passing_grade: DEFAULT_PASSING_GRADE,
            grade_scales: None,
            overridden_gpa: UNGRADED,
            overridden_grade: UNGRADED,
            start_date: dates::min_persisted(),
            end_date: dates::min_persisted(),
        }
    }
}

impl Entity for Class {
    fn item_type(&self) -> ItemType {
        ItemType::Class
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

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.course_number.is_empty() {
            write!(f, "{}", self.name.name)
        } else {
            write!(f, "{} ({})", self.name.name, self.course_number)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_defaults() {
        let class = Class::new(Uuid::new_v4(), "Calculus");
        assert_eq!(class.color, "#1BA1E2");
        assert_eq!(class.credits, NO_CREDITS);
        assert!(!class.has_credits());
        assert!(class.does_round_grades_up);
        assert!(!class.should_average_grade_totals);
        assert_eq!(class.passing_grade, 0.6);
        assert_eq!(class.gpa_type, GpaType::Standard);
        assert_eq!(class.overridden_grade, UNGRADED);
        assert!(dates::is_unassigned(class.start_date));
        assert_eq!(class.level(), 2);
    }

    #[test]
    fn test_class_builder() {
        let class = Class::new(Uuid::new_v4(), "Physics")
            .with_color("#FF0000")
            .with_credits(4.0)
            .with_course_number("PHYS 141");

        assert_eq!(class.color, "#FF0000");
        assert!(class.has_credits());
        assert_eq!(class.to_string(), "Physics (PHYS 141)");
    }

    #[test]
    fn test_effective_grade_scales() {
        let class = Class::new(Uuid::new_v4(), "Art");
        assert_eq!(class.effective_grade_scales(), GradeScale::default_scale());

        let custom = class.with_grade_scales(GradeScale::eleven_point_scale());
        assert_eq!(custom.effective_grade_scales().len(), 12);
    }

    #[test]
    fn test_missing_fields_take_documented_defaults() {
        let json = format!(
            r#"{{"Identifier":"{}","UpperIdentifier":"{}","Name":"History"}}"#,
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let class: Class = serde_json::from_str(&json).unwrap();
        assert_eq!(class.name.name, "History");
        assert_eq!(class.color, DEFAULT_CLASS_COLOR);
        assert_eq!(class.credits, NO_CREDITS);
        assert!(class.does_round_grades_up);
        assert!(class.grade_scales.is_none());
    }

    #[test]
    fn test_class_json_roundtrip() {
        let class = Class::new(Uuid::new_v4(), "Chemistry")
            .with_grade_scales(GradeScale::twelve_point_scale());
        let json = serde_json::to_string(&class).unwrap();
        let parsed: Class = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, class);
    }
}
