//! Field groups shared by the entity variants.
//!
//! Each entity embeds only the groups it needs; every group is flattened on the wire so
//! the JSON shape stays one flat object per entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dates::{self, wall_clock};
use super::error::ModelError;
use super::image::ImageIdentifier;

pub const MAX_NAME_LENGTH: usize = 600;
pub const MAX_DETAILS_LENGTH: usize = 4000;
pub const MAX_IMAGES: usize = 15;

/// Points received/total of an item that hasn't been graded yet. Also the "not
/// overridden" value of GPA and grade overrides.
pub const UNGRADED: f64 = -50.0;

/// Credits of a class that doesn't have any.
pub const NO_CREDITS: f64 = -1.0;

pub const DEFAULT_GRADE_TOTAL: f64 = 100.0;
pub const DEFAULT_INDIVIDUAL_WEIGHT: f64 = 1.0;

/// Item hasn't been put in a weight category yet.
pub const WEIGHT_CATEGORY_UNASSIGNED: Uuid = Uuid::nil();

/// Item will never be graded.
pub const WEIGHT_CATEGORY_EXCLUDED: Uuid = Uuid::from_u128(0x1111_1111_1111_1111_1111_1111_1111_1111);

pub fn is_ungraded(value: f64) -> bool {
    value == UNGRADED
}

/// Fields every entity carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BaseFields {
    identifier: Uuid,
    upper_identifier: Uuid,
    #[serde(with = "wall_clock")]
    pub updated: DateTime<Utc>,
    #[serde(with = "wall_clock")]
    pub date_created: DateTime<Utc>,
}

impl BaseFields {
    /// Fresh identifier, both timestamps set to now.
    pub fn new(upper_identifier: Uuid) -> Self {
        let now = Utc::now();
        Self {
            identifier: Uuid::new_v4(),
            upper_identifier,
            updated: now,
            date_created: now,
        }
    }

    pub fn with_identifier(mut self, identifier: Uuid) -> Self {
        self.identifier = identifier;
        self
    }

    pub fn identifier(&self) -> Uuid {
        self.identifier
    }

    pub fn upper_identifier(&self) -> Uuid {
        self.upper_identifier
    }

    pub(crate) fn set_upper_identifier(&mut self, upper_identifier: Uuid) {
        self.upper_identifier = upper_identifier;
    }

    /// Marks the entity as modified now.
    pub fn touch(&mut self) {
        self.updated = Utc::now();
    }
}

impl Default for BaseFields {
    fn default() -> Self {
        Self {
            identifier: Uuid::nil(),
            upper_identifier: Uuid::nil(),
            updated: dates::unassigned(),
            date_created: dates::unassigned(),
        }
    }
}

/// Second parent of a link entity. Unlike the first parent it may be repointed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LinkFields {
    pub second_upper_identifier: Uuid,
}

/// User-entered name: at most 600 characters, single line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NameFields {
    pub name: String,
}

impl NameFields {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// User-entered details: at most 4000 characters, line breaks allowed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DetailFields {
    pub details: String,
}

/// Up to 15 image names, each formatted as an [`ImageIdentifier`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ImageFields {
    pub image_names: Vec<String>,
}

/// GPA and credits the user explicitly set on a year or semester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideFields {
    #[serde(rename = "OverriddenGPA")]
    pub overridden_gpa: f64,
    #[serde(rename = "OverriddenCredits")]
    pub overridden_credits: f64,
}

impl Default for OverrideFields {
    fn default() -> Self {
        Self {
            overridden_gpa: UNGRADED,
            overridden_credits: UNGRADED,
        }
    }
}

/// Date and points of homework, exams, tasks, mega items and grades.
///
/// `date` is a UTC-tagged wall-clock value; a time of 00:00:00 means "no start time".
/// Defaults: no due date, ungraded out of 100, not dropped, weight 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GradedFields {
    #[serde(with = "wall_clock")]
    pub date: DateTime<Utc>,
    pub grade_received: f64,
    pub grade_total: f64,
    pub is_dropped: bool,
    pub individual_weight: f64,
}

impl GradedFields {
    pub fn on(date: DateTime<Utc>) -> Self {
        Self {
            date,
            ..Self::default()
        }
    }

    pub fn is_graded(&self) -> bool {
        !is_ungraded(self.grade_received) && !is_ungraded(self.grade_total)
    }

    /// Whether the entry takes part in grade aggregation.
    pub fn counts_toward_grade(&self) -> bool {
        self.is_graded() && !self.is_dropped
    }
}

impl Default for GradedFields {
    fn default() -> Self {
        Self {
            date: dates::no_due_date(),
            grade_received: UNGRADED,
            grade_total: DEFAULT_GRADE_TOTAL,
            is_dropped: false,
            individual_weight: DEFAULT_INDIVIDUAL_WEIGHT,
        }
    }
}

/// End time, reminder and weight category of homework, exams, tasks and mega items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DueFields {
    #[serde(with = "wall_clock")]
    pub end_time: DateTime<Utc>,
    #[serde(with = "wall_clock")]
    pub reminder: DateTime<Utc>,
    pub weight_category_identifier: Uuid,
}

impl DueFields {
    pub fn is_excluded_from_grades(&self) -> bool {
        self.weight_category_identifier == WEIGHT_CATEGORY_EXCLUDED
    }
}

impl Default for DueFields {
    fn default() -> Self {
        Self {
            end_time: dates::unassigned(),
            reminder: dates::unassigned(),
            weight_category_identifier: WEIGHT_CATEGORY_UNASSIGNED,
        }
    }
}

pub fn validate_name(fields: &NameFields) -> Result<(), ModelError> {
    let length = fields.name.chars().count();
    if length > MAX_NAME_LENGTH {
        return Err(ModelError::NameTooLong(length));
    }
    if fields.name.contains(['\n', '\r']) {
        return Err(ModelError::NameHasLineBreak);
    }
    Ok(())
}

pub fn validate_details(fields: &DetailFields) -> Result<(), ModelError> {
    let length = fields.details.chars().count();
    if length > MAX_DETAILS_LENGTH {
        return Err(ModelError::DetailsTooLong(length));
    }
    Ok(())
}

pub fn validate_images(fields: &ImageFields) -> Result<(), ModelError> {
    if fields.image_names.len() > MAX_IMAGES {
        return Err(ModelError::TooManyImages(fields.image_names.len()));
    }
    for name in &fields.image_names {
        name.parse::<ImageIdentifier>()?;
    }
    Ok(())
}

pub fn validate_percent_complete(percent_complete: f64) -> Result<(), ModelError> {
    if !(0.0..=1.0).contains(&percent_complete) {
        return Err(ModelError::PercentCompleteOutOfRange(percent_complete));
    }
    Ok(())
}

/// Name, details and images together, the common case for user-editable entities.
pub fn validate_text(
    name: &NameFields,
    details: &DetailFields,
    images: &ImageFields,
) -> Result<(), ModelError> {
    validate_name(name)?;
    validate_details(details)?;
    validate_images(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excluded_weight_category_pattern() {
        assert_eq!(
            WEIGHT_CATEGORY_EXCLUDED.to_string(),
            "11111111-1111-1111-1111-111111111111"
        );
        assert!(WEIGHT_CATEGORY_UNASSIGNED.is_nil());
    }

    #[test]
    fn test_graded_defaults() {
        let graded = GradedFields::default();
        assert_eq!(graded.date, dates::no_due_date());
        assert_eq!(graded.grade_received, UNGRADED);
        assert_eq!(graded.grade_total, 100.0);
        assert_eq!(graded.individual_weight, 1.0);
        assert!(!graded.is_graded());
        assert!(!graded.counts_toward_grade());
    }

    #[test]
    fn test_dropped_grade_does_not_count() {
        let graded = GradedFields {
            grade_received: 90.0,
            is_dropped: true,
            ..GradedFields::default()
        };
        assert!(graded.is_graded());
        assert!(!graded.counts_toward_grade());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name(&NameFields::new("Essay 1")).is_ok());
        assert_eq!(
            validate_name(&NameFields::new("two\nlines")),
            Err(ModelError::NameHasLineBreak)
        );
        assert_eq!(
            validate_name(&NameFields::new("a".repeat(601))),
            Err(ModelError::NameTooLong(601))
        );
        // Length counts characters, not bytes.
        assert!(validate_name(&NameFields::new("é".repeat(600))).is_ok());
    }

    #[test]
    fn test_validate_details_allows_line_breaks() {
        let details = DetailFields {
            details: "line one\nline two".to_string(),
        };
        assert!(validate_details(&details).is_ok());

        let long = DetailFields {
            details: "x".repeat(4001),
        };
        assert_eq!(validate_details(&long), Err(ModelError::DetailsTooLong(4001)));
    }

    #[test]
    fn test_validate_images() {
        let ok = ImageFields {
            image_names: vec!["1-2.jpg".to_string()],
        };
        assert!(validate_images(&ok).is_ok());

        let bad = ImageFields {
            image_names: vec!["photo.jpg".to_string()],
        };
        assert!(matches!(
            validate_images(&bad),
            Err(ModelError::InvalidImageName(_))
        ));

        let too_many = ImageFields {
            image_names: (0..16).map(|i| format!("1-{i}.jpg")).collect(),
        };
        assert_eq!(validate_images(&too_many), Err(ModelError::TooManyImages(16)));
    }

    #[test]
    fn test_base_fields_json_uses_wire_names() {
        let base = BaseFields::new(Uuid::nil());
        let json = serde_json::to_value(&base).unwrap();
        assert!(json.get("Identifier").is_some());
        assert!(json.get("UpperIdentifier").is_some());
        assert!(json.get("Updated").is_some());
        assert!(json.get("DateCreated").is_some());

        let parsed: BaseFields = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, base);
    }
}
