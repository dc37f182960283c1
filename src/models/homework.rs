//! Discrete homework, exam and task shapes.
//!
//! Newer clients send these as [`MegaItem`](super::mega_item::MegaItem)s; the discrete
//! shapes remain for clients that predate the unified item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ModelError;
use super::fields::{
    validate_percent_complete, validate_text, BaseFields, DetailFields, DueFields,
    GradedFields, ImageFields, NameFields,
};
use super::item::{Entity, ItemType};

/// Homework sits under a class and may move to another class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Homework {
    #[serde(flatten)]
    pub base: BaseFields,
    #[serde(flatten)]
    pub name: NameFields,
    #[serde(flatten)]
    pub details: DetailFields,
    #[serde(flatten)]
    pub images: ImageFields,
    #[serde(flatten)]
    pub graded: GradedFields,
    #[serde(flatten)]
    pub due: DueFields,
    /// 0 is incomplete, 1 is complete. Platforms without partial completion treat
    /// anything below 1 as incomplete.
    #[serde(default)]
    pub percent_complete: f64,
}

impl Homework {
    pub fn new(class_identifier: Uuid, name: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            base: BaseFields::new(class_identifier),
            name: NameFields::new(name),
            graded: GradedFields::on(date),
            ..Self::default()
        }
    }

    pub fn with_percent_complete(mut self, percent_complete: f64) -> Self {
        self.percent_complete = percent_complete;
        self
    }

    pub fn is_complete(&self) -> bool {
        self.percent_complete >= 1.0
    }
}

impl Entity for Homework {
    fn item_type(&self) -> ItemType {
        ItemType::Homework
    }

    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseFields {
        &mut self.base
    }

    fn date(&self) -> Option<DateTime<Utc>> {
        Some(self.graded.date)
    }

    fn validate(&self) -> Result<(), ModelError> {
        validate_text(&self.name, &self.details, &self.images)?;
        validate_percent_complete(self.percent_complete)
    }
}

/// Exams sit under a class and may move to another class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    #[serde(flatten)]
    pub base: BaseFields,
    #[serde(flatten)]
    pub name: NameFields,
    #[serde(flatten)]
    pub details: DetailFields,
    #[serde(flatten)]
    pub images: ImageFields,
    #[serde(flatten)]
    pub graded: GradedFields,
    #[serde(flatten)]
    pub due: DueFields,
}

impl Exam {
    pub fn new(class_identifier: Uuid, name: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            base: BaseFields::new(class_identifier),
            name: NameFields::new(name),
            graded: GradedFields::on(date),
            ..Self::default()
        }
    }

    pub fn with_reminder(mut self, reminder: DateTime<Utc>) -> Self {
        self.due.reminder = reminder;
        self
    }
}

impl Entity for Exam {
    fn item_type(&self) -> ItemType {
        ItemType::Exam
    }

    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseFields {
        &mut self.base
    }

    fn date(&self) -> Option<DateTime<Utc>> {
        Some(self.graded.date)
    }

    fn validate(&self) -> Result<(), ModelError> {
        validate_text(&self.name, &self.details, &self.images)
    }
}

/// General to-dos under a semester ("Get more paper"). Tasks never move.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Task {
    #[serde(flatten)]
    pub base: BaseFields,
    #[serde(flatten)]
    pub name: NameFields,
    #[serde(flatten)]
    pub details: DetailFields,
    #[serde(flatten)]
    pub images: ImageFields,
    #[serde(flatten)]
    pub graded: GradedFields,
    #[serde(flatten)]
    pub due: DueFields,
    #[serde(default)]
    pub percent_complete: f64,
}

impl Task {
    pub fn new(semester_identifier: Uuid, name: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            base: BaseFields::new(semester_identifier),
            name: NameFields::new(name),
            graded: GradedFields::on(date),
            ..Self::default()
        }
    }
}

impl Entity for Task {
    fn item_type(&self) -> ItemType {
        ItemType::Task
    }

    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseFields {
        &mut self.base
    }

    fn date(&self) -> Option<DateTime<Utc>> {
        Some(self.graded.date)
    }

    fn validate(&self) -> Result<(), ModelError> {
        validate_text(&self.name, &self.details, &self.images)?;
        validate_percent_complete(self.percent_complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dates;
    use crate::models::fields::{UNGRADED, WEIGHT_CATEGORY_UNASSIGNED};
    use chrono::TimeZone;

    fn due() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 7, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_homework_new() {
        let class_id = Uuid::new_v4();
        let homework = Homework::new(class_id, "Problem set 3", due());

        assert_eq!(homework.upper_identifier(), class_id);
        assert_eq!(homework.graded.date, due());
        assert_eq!(homework.graded.grade_received, UNGRADED);
        assert_eq!(homework.due.reminder, dates::unassigned());
        assert_eq!(homework.due.weight_category_identifier, WEIGHT_CATEGORY_UNASSIGNED);
        assert!(!homework.is_complete());
        assert_eq!(homework.level(), 3);
    }

    #[test]
    fn test_homework_percent_complete_validation() {
        let homework = Homework::new(Uuid::new_v4(), "Essay", due()).with_percent_complete(1.5);
        assert_eq!(
            homework.validate(),
            Err(ModelError::PercentCompleteOutOfRange(1.5))
        );

        let done = Homework::new(Uuid::new_v4(), "Essay", due()).with_percent_complete(1.0);
        assert!(done.validate().is_ok());
        assert!(done.is_complete());
    }

    #[test]
    fn test_exam_reminder() {
        let reminder = Utc.with_ymd_and_hms(2024, 10, 6, 20, 0, 0).unwrap();
        let exam = Exam::new(Uuid::new_v4(), "Midterm", due()).with_reminder(reminder);
        assert_eq!(exam.due.reminder, reminder);
        assert_eq!(exam.level(), 3);
    }

    #[test]
    fn test_task_level() {
        let task = Task::new(Uuid::new_v4(), "Buy paper", dates::no_due_date());
        assert_eq!(task.level(), 2);
    }

    #[test]
    fn test_homework_json_roundtrip() {
        let homework = Homework::new(Uuid::new_v4(), "Reading", due()).with_percent_complete(0.5);
        let json = serde_json::to_string(&homework).unwrap();
        assert!(json.contains("\"PercentComplete\":0.5"));
        assert!(json.contains("\"GradeReceived\":-50.0"));

        let parsed: Homework = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, homework);
    }
}
