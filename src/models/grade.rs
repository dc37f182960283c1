use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ModelError;
use super::fields::{validate_text, BaseFields, DetailFields, GradedFields, ImageFields, NameFields};
use super::item::{Entity, ItemType};

/// A grade sits under a weight category. It may move to another weight category of
/// the same class but never to another class.
///
/// Grades are ordered by `Date` alone; recency of `Updated` plays no part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grade {
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
}

impl Grade {
    pub fn new(
        weight_category_identifier: Uuid,
        name: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            base: BaseFields::new(weight_category_identifier),
            name: NameFields::new(name),
            graded: GradedFields::on(date),
            ..Self::default()
        }
    }

    pub fn with_points(mut self, received: f64, total: f64) -> Self {
        self.graded.grade_received = received;
        self.graded.grade_total = total;
        self
    }
}

impl Entity for Grade {
    fn item_type(&self) -> ItemType {
        ItemType::Grade
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

/// Grading category of a class ("Exams", 40). Weight categories never move.
///
/// Weights of a class don't need to add up to 100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WeightCategory {
    #[serde(flatten)]
    pub base: BaseFields,
    #[serde(flatten)]
    pub name: NameFields,
    #[serde(flatten)]
    pub details: DetailFields,
    #[serde(flatten)]
    pub images: ImageFields,
    #[serde(default)]
    pub weight_value: f64,
}

impl WeightCategory {
    pub const DEFAULT_NAME: &'static str = "All Grades";
    pub const DEFAULT_WEIGHT: f64 = 100.0;

    pub fn new(class_identifier: Uuid, name: impl Into<String>, weight_value: f64) -> Self {
        Self {
            base: BaseFields::new(class_identifier),
            name: NameFields::new(name),
            weight_value,
            ..Self::default()
        }
    }

    /// The single category a new class starts with.
    pub fn all_grades(class_identifier: Uuid) -> Self {
        Self::new(class_identifier, Self::DEFAULT_NAME, Self::DEFAULT_WEIGHT)
    }
}

impl Entity for WeightCategory {
    fn item_type(&self) -> ItemType {
        ItemType::WeightCategory
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_grade_new() {
        let category = WeightCategory::all_grades(Uuid::new_v4());
        let date = Utc.with_ymd_and_hms(2024, 9, 20, 0, 0, 0).unwrap();
        let grade = Grade::new(category.identifier(), "Quiz 1", date).with_points(8.0, 10.0);

        assert_eq!(grade.upper_identifier(), category.identifier());
        assert!(grade.graded.counts_toward_grade());
        assert_eq!(grade.level(), 4);
        assert_eq!(grade.date(), Some(date));
    }

    #[test]
    fn test_ungraded_grade_still_serializes_sentinel() {
        let grade = Grade::new(Uuid::new_v4(), "Upcoming", Utc::now());
        let json = serde_json::to_string(&grade).unwrap();
        assert!(json.contains("\"GradeReceived\":-50.0"));

        let parsed: Grade = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, grade);
        assert!(!parsed.graded.is_graded());
    }

    #[test]
    fn test_default_weight_category() {
        let class_id = Uuid::new_v4();
        let category = WeightCategory::all_grades(class_id);
        assert_eq!(category.name.name, "All Grades");
        assert_eq!(category.weight_value, 100.0);
        assert_eq!(category.upper_identifier(), class_id);
        assert_eq!(category.level(), 3);
    }
}
