//! Account-wide class attributes and subjects, and their links to classes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ModelError;
use super::fields::{validate_name, validate_details, BaseFields, DetailFields, LinkFields, NameFields};
use super::item::{Entity, ItemType};

/// A label such as "Honors" or "Online" that can be attached to any number of classes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassAttribute {
    #[serde(flatten)]
    pub base: BaseFields,
    #[serde(flatten)]
    pub name: NameFields,
}

impl ClassAttribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: BaseFields::new(Uuid::nil()),
            name: NameFields::new(name),
        }
    }
}

impl Entity for ClassAttribute {
    fn item_type(&self) -> ItemType {
        ItemType::ClassAttribute
    }

    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseFields {
        &mut self.base
    }

    fn validate(&self) -> Result<(), ModelError> {
        validate_name(&self.name)
    }
}

/// A subject area ("Mathematics") classes can be filed under.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassSubject {
    #[serde(flatten)]
    pub base: BaseFields,
    #[serde(flatten)]
    pub name: NameFields,
    #[serde(flatten)]
    pub details: DetailFields,
}

impl ClassSubject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: BaseFields::new(Uuid::nil()),
            name: NameFields::new(name),
            details: DetailFields::default(),
        }
    }
}

impl Entity for ClassSubject {
    fn item_type(&self) -> ItemType {
        ItemType::ClassSubject
    }

    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseFields {
        &mut self.base
    }

    fn validate(&self) -> Result<(), ModelError> {
        validate_name(&self.name)?;
        validate_details(&self.details)
    }
}

/// Links an attribute (second parent) to a class (first parent).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassAttributeUnderClass {
    #[serde(flatten)]
    pub base: BaseFields,
    #[serde(flatten)]
    pub link: LinkFields,
}

impl ClassAttributeUnderClass {
    pub fn new(class_identifier: Uuid, attribute_identifier: Uuid) -> Self {
        Self {
            base: BaseFields::new(class_identifier),
            link: LinkFields {
                second_upper_identifier: attribute_identifier,
            },
        }
    }
}

impl Entity for ClassAttributeUnderClass {
    fn item_type(&self) -> ItemType {
        ItemType::ClassAttributeUnderClass
    }

    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseFields {
        &mut self.base
    }

    fn second_upper_identifier(&self) -> Option<Uuid> {
        Some(self.link.second_upper_identifier)
    }
}

/// Links a subject (second parent) to a class (first parent).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassSubjectUnderClass {
    #[serde(flatten)]
    pub base: BaseFields,
    #[serde(flatten)]
    pub link: LinkFields,
}

impl ClassSubjectUnderClass {
    pub fn new(class_identifier: Uuid, subject_identifier: Uuid) -> Self {
        Self {
            base: BaseFields::new(class_identifier),
            link: LinkFields {
                second_upper_identifier: subject_identifier,
            },
        }
    }
}

impl Entity for ClassSubjectUnderClass {
    fn item_type(&self) -> ItemType {
        ItemType::ClassSubjectUnderClass
    }

    fn base(&self) -> &BaseFields {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseFields {
        &mut self.base
    }

    fn second_upper_identifier(&self) -> Option<Uuid> {
        Some(self.link.second_upper_identifier)
    }
}
