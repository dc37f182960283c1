use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::error::ModelError;
use super::fields::{validate_text, BaseFields, DetailFields, ImageFields, LinkFields, NameFields};
use super::item::{Entity, ItemType};

/// Kind of a teacher's phone number.
///
/// JSON carries the variant name. Deployed clients persist a numeric code instead,
/// where `Fax` and `Other` share 3; [`PhoneType::code`] reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhoneType {
    #[default]
    Office,
    Home,
    Cell,
    Fax,
    Other,
}

impl PhoneType {
    pub fn code(self) -> u8 {
        match self {
            PhoneType::Office => 0,
            PhoneType::Home => 1,
            PhoneType::Cell => 2,
            PhoneType::Fax | PhoneType::Other => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmailType {
    #[default]
    Work,
    Personal,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressType {
    #[default]
    Work,
    Home,
    PostOfficeBox,
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PhoneNumber {
    pub number: String,
    pub extension: String,
    pub phone_type: PhoneType,
}

impl PhoneNumber {
    pub fn new(number: impl Into<String>, phone_type: PhoneType) -> Self {
        Self {
            number: number.into(),
            extension: String::new(),
            phone_type,
        }
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extension.is_empty() {
            write!(f, "{}", self.number)
        } else {
            write!(f, "{} ext. {}", self.number, self.extension)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EmailAddress {
    pub email: String,
    pub email_type: EmailType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PostalAddress {
    pub street_line1: String,
    pub street_line2: String,
    pub city: String,
    pub state: String,
    #[serde(rename = "ZIP")]
    pub zip: String,
    pub country: String,
    pub address_type: AddressType,
}

/// Teachers are top level and linked to schedules through [`TeacherUnderSchedule`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Teacher {
    #[serde(flatten)]
    pub base: BaseFields,
    #[serde(flatten)]
    pub name: NameFields,
    #[serde(flatten)]
    pub details: DetailFields,
    #[serde(flatten)]
    pub images: ImageFields,
    #[serde(default)]
    pub phone_numbers: Vec<PhoneNumber>,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub postal_addresses: Vec<PostalAddress>,
    #[serde(default)]
    pub office_locations: Vec<String>,
}

impl Teacher {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: BaseFields::new(Uuid::nil()),
            name: NameFields::new(name),
            ..Self::default()
        }
    }

    pub fn with_phone(mut self, phone: PhoneNumber) -> Self {
        self.phone_numbers.push(phone);
        self
    }

    pub fn with_email(mut self, email: impl Into<String>, email_type: EmailType) -> Self {
        self.email_addresses.push(EmailAddress {
            email: email.into(),
            email_type,
        });
        self
    }

    pub fn with_office(mut self, location: impl Into<String>) -> Self {
        self.office_locations.push(location.into());
        self
    }
}

impl Entity for Teacher {
    fn item_type(&self) -> ItemType {
        ItemType::Teacher
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

/// Links a teacher (second parent) to a schedule (first parent).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeacherUnderSchedule {
    #[serde(flatten)]
    pub base: BaseFields,
    #[serde(flatten)]
    pub link: LinkFields,
}

impl TeacherUnderSchedule {
    pub fn new(schedule_identifier: Uuid, teacher_identifier: Uuid) -> Self {
        Self {
            base: BaseFields::new(schedule_identifier),
            link: LinkFields {
                second_upper_identifier: teacher_identifier,
            },
        }
    }
}

impl Entity for TeacherUnderSchedule {
    fn item_type(&self) -> ItemType {
        ItemType::TeacherUnderSchedule
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
