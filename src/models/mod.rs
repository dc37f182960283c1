mod class;
mod class_attribute;
pub mod dates;
mod error;
pub mod fields;
mod grade;
mod grade_scale;
mod homework;
mod image;
mod item;
mod mega_item;
mod schedule;
mod teacher;
mod year;

pub use class::{Class, GpaType, DEFAULT_CLASS_COLOR, DEFAULT_PASSING_GRADE};
pub use class_attribute::{
    ClassAttribute, ClassAttributeUnderClass, ClassSubject, ClassSubjectUnderClass,
};
pub use error::ModelError;
pub use fields::{
    BaseFields, DetailFields, DueFields, GradedFields, ImageFields, LinkFields, NameFields,
    OverrideFields,
};
pub use grade::{Grade, WeightCategory};
pub use grade_scale::GradeScale;
pub use homework::{Exam, Homework, Task};
pub use image::ImageIdentifier;
pub use item::{compare_for_display, sort_for_display, Entity, Item, ItemRef, ItemType};
pub use mega_item::{MegaItem, MegaItemType};
pub use schedule::{Schedule, ScheduleType, ScheduleWeek};
pub use teacher::{
    AddressType, EmailAddress, EmailType, PhoneNumber, PhoneType, PostalAddress, Teacher,
    TeacherUnderSchedule,
};
pub use year::{Semester, Year};
