use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::error::ModelError;
use super::fields::{
    validate_percent_complete, validate_text, BaseFields, DetailFields, DueFields,
    GradedFields, ImageFields, NameFields,
};
use super::homework::{Exam, Homework};
use super::item::{Entity, Item, ItemType};

/// Sub-kind of a [`MegaItem`]. JSON carries the variant name; the discriminants are
/// the numeric codes deployed clients persist locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MegaItemType {
    #[default]
    Homework = 0,
    Exam = 1,
    Holiday = 2,
    Task = 3,
    Event = 4,
    ClassTime = 5,
}

impl MegaItemType {
    pub const ALL: [MegaItemType; 6] = [
        MegaItemType::Homework,
        MegaItemType::Exam,
        MegaItemType::Holiday,
        MegaItemType::Task,
        MegaItemType::Event,
        MegaItemType::ClassTime,
    ];

    /// Holidays, tasks and events hang off a semester like classes do, so they apply at
    /// level 2. Class-bound kinds apply at level 3 next to legacy homework and exams.
    pub fn level(self) -> u8 {
        match self {
            MegaItemType::Holiday | MegaItemType::Task | MegaItemType::Event => 2,
            MegaItemType::Homework | MegaItemType::Exam | MegaItemType::ClassTime => 3,
        }
    }

    /// Whether clients that predate mega items have a shape for this kind.
    pub fn has_legacy_shape(self) -> bool {
        matches!(self, MegaItemType::Homework | MegaItemType::Exam)
    }
}

impl fmt::Display for MegaItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MegaItemType::Homework => write!(f, "homework"),
            MegaItemType::Exam => write!(f, "exam"),
            MegaItemType::Holiday => write!(f, "holiday"),
            MegaItemType::Task => write!(f, "task"),
            MegaItemType::Event => write!(f, "event"),
            MegaItemType::ClassTime => write!(f, "class time"),
        }
    }
}

impl FromStr for MegaItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace([' ', '_'], "").as_str() {
            "homework" => Ok(MegaItemType::Homework),
            "exam" => Ok(MegaItemType::Exam),
            "holiday" => Ok(MegaItemType::Holiday),
            "task" => Ok(MegaItemType::Task),
            "event" => Ok(MegaItemType::Event),
            "classtime" => Ok(MegaItemType::ClassTime),
            _ => Err(format!(
                "Invalid mega item type '{}'. Valid options: homework, exam, holiday, task, event, class time",
                s
            )),
        }
    }
}

/// Unified planner item covering homework, exams, holidays, tasks, events and class
/// times. Class-bound kinds sit under a class, the others under a semester.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MegaItem {
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
    #[serde(default)]
    pub mega_item_type: MegaItemType,
}

impl MegaItem {
    pub fn new(
        mega_item_type: MegaItemType,
        upper_identifier: Uuid,
        name: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            base: BaseFields::new(upper_identifier),
            name: NameFields::new(name),
            graded: GradedFields::on(date),
            mega_item_type,
            ..Self::default()
        }
    }

    pub fn with_percent_complete(mut self, percent_complete: f64) -> Self {
        self.percent_complete = percent_complete;
        self
    }

    /// Projects the item onto the discrete homework or exam shape understood by
    /// older clients. Other kinds have no legacy shape and yield `None`; callers omit
    /// them from legacy payloads.
    pub fn downgrade(&self) -> Option<Item> {
        match self.mega_item_type {
            MegaItemType::Homework => Some(Item::Homework(Homework {
                base: self.base.clone(),
                name: self.name.clone(),
                details: self.details.clone(),
                images: self.images.clone(),
                graded: self.graded.clone(),
                due: self.due.clone(),
                percent_complete: self.percent_complete,
            })),
            MegaItemType::Exam => Some(Item::Exam(Exam {
                base: self.base.clone(),
                name: self.name.clone(),
                details: self.details.clone(),
                images: self.images.clone(),
                graded: self.graded.clone(),
                due: self.due.clone(),
            })),
            MegaItemType::Holiday
            | MegaItemType::Task
            | MegaItemType::Event
            | MegaItemType::ClassTime => None,
        }
    }
}

impl Entity for MegaItem {
    fn item_type(&self) -> ItemType {
        ItemType::MegaItem
    }

    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseFields {
        &mut self.base
    }

    fn level(&self) -> u8 {
        self.mega_item_type.level()
    }

    fn date(&self) -> Option<DateTime<Utc>> {
        Some(self.graded.date)
    }

    fn validate(&self) -> Result<(), ModelError> {
        validate_text(&self.name, &self.details, &self.images)?;
        validate_percent_complete(self.percent_complete)
    }
}
