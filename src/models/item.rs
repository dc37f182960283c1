//! The closed set of synchronizable entities.
//!
//! [`ItemType`] names every variant and fixes its level in the hierarchy, [`Entity`] is
//! the view shared by all concrete types, and [`Item`] / [`ItemRef`] carry one entity
//! of any variant, tagged with `ItemType` on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::class::Class;
use super::class_attribute::{
    ClassAttribute, ClassAttributeUnderClass, ClassSubject, ClassSubjectUnderClass,
};
use super::error::ModelError;
use super::fields::BaseFields;
use super::grade::{Grade, WeightCategory};
use super::homework::{Exam, Homework, Task};
use super::mega_item::MegaItem;
use super::schedule::Schedule;
use super::teacher::{Teacher, TeacherUnderSchedule};
use super::year::{Semester, Year};

/// Variant tag. JSON carries the variant name; the discriminants are the numeric
/// codes deployed clients persist locally, exposed through [`ItemType::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemType {
    Year = 0,
    Teacher = 1,
    Semester = 2,
    Class = 3,
    Task = 4,
    Homework = 5,
    Exam = 6,
    WeightCategory = 7,
    Schedule = 8,
    Grade = 9,
    TeacherUnderSchedule = 10,
    ClassAttribute = 11,
    ClassSubject = 12,
    ClassAttributeUnderClass = 13,
    ClassSubjectUnderClass = 14,
    MegaItem = 15,
}

impl ItemType {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub const ALL: [ItemType; 16] = [
        ItemType::Year,
        ItemType::Teacher,
        ItemType::Semester,
        ItemType::Class,
        ItemType::Task,
        ItemType::Homework,
        ItemType::Exam,
        ItemType::WeightCategory,
        ItemType::Schedule,
        ItemType::Grade,
        ItemType::TeacherUnderSchedule,
        ItemType::ClassAttribute,
        ItemType::ClassSubject,
        ItemType::ClassAttributeUnderClass,
        ItemType::ClassSubjectUnderClass,
        ItemType::MegaItem,
    ];

    /// Depth in the hierarchy. Mega items report the level of their class-bound kinds;
    /// use [`Entity::level`] on an instance to account for the sub-kind.
    pub fn level(self) -> u8 {
        match self {
            ItemType::Year
            | ItemType::Teacher
            | ItemType::ClassAttribute
            | ItemType::ClassSubject => 0,
            ItemType::Semester => 1,
            ItemType::Class | ItemType::Task => 2,
            ItemType::Homework
            | ItemType::Exam
            | ItemType::WeightCategory
            | ItemType::Schedule
            | ItemType::ClassAttributeUnderClass
            | ItemType::ClassSubjectUnderClass
            | ItemType::MegaItem => 3,
            ItemType::Grade | ItemType::TeacherUnderSchedule => 4,
        }
    }

    /// Top-level variants have a nil parent.
    pub fn is_top_level(self) -> bool {
        self.level() == 0
    }

    /// Link variants associate two parents; only the second may be repointed.
    pub fn is_link(self) -> bool {
        matches!(
            self,
            ItemType::TeacherUnderSchedule
                | ItemType::ClassAttributeUnderClass
                | ItemType::ClassSubjectUnderClass
        )
    }

    /// Whether an existing entity of this variant may get a new (first) parent.
    pub fn can_change_parent(self) -> bool {
        matches!(
            self,
            ItemType::Class
                | ItemType::Homework
                | ItemType::Exam
                | ItemType::Grade
                | ItemType::MegaItem
        )
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemType::Year => "Year",
            ItemType::Teacher => "Teacher",
            ItemType::Semester => "Semester",
            ItemType::Class => "Class",
            ItemType::Task => "Task",
            ItemType::Homework => "Homework",
            ItemType::Exam => "Exam",
            ItemType::WeightCategory => "WeightCategory",
            ItemType::Schedule => "Schedule",
            ItemType::Grade => "Grade",
            ItemType::TeacherUnderSchedule => "TeacherUnderSchedule",
            ItemType::ClassAttribute => "ClassAttribute",
            ItemType::ClassSubject => "ClassSubject",
            ItemType::ClassAttributeUnderClass => "ClassAttributeUnderClass",
            ItemType::ClassSubjectUnderClass => "ClassSubjectUnderClass",
            ItemType::MegaItem => "MegaItem",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemType::ALL
            .into_iter()
            .find(|kind| kind.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Invalid item type '{}'", s))
    }
}

/// Behavior shared by every concrete entity.
pub trait Entity {
    fn item_type(&self) -> ItemType;

    fn base(&self) -> &BaseFields;

    fn base_mut(&mut self) -> &mut BaseFields;

    fn level(&self) -> u8 {
        self.item_type().level()
    }

    /// Field limits of the variant (name, details, images, percent complete).
    fn validate(&self) -> Result<(), ModelError> {
        Ok(())
    }

    fn identifier(&self) -> Uuid {
        self.base().identifier()
    }

    fn upper_identifier(&self) -> Uuid {
        self.base().upper_identifier()
    }

    fn updated(&self) -> DateTime<Utc> {
        self.base().updated
    }

    fn date_created(&self) -> DateTime<Utc> {
        self.base().date_created
    }

    /// Planner date of date-bearing variants.
    fn date(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn second_upper_identifier(&self) -> Option<Uuid> {
        None
    }
}

/// Expands `$body` once per variant with `$inner` bound to the wrapped value.
macro_rules! each_variant {
    ($value:expr, $enum:ident, $inner:ident => $body:expr) => {
        match $value {
            $enum::Year($inner) => $body,
            $enum::Teacher($inner) => $body,
            $enum::Semester($inner) => $body,
            $enum::Class($inner) => $body,
            $enum::Task($inner) => $body,
            $enum::Homework($inner) => $body,
            $enum::Exam($inner) => $body,
            $enum::WeightCategory($inner) => $body,
            $enum::Schedule($inner) => $body,
            $enum::Grade($inner) => $body,
            $enum::TeacherUnderSchedule($inner) => $body,
            $enum::ClassAttribute($inner) => $body,
            $enum::ClassSubject($inner) => $body,
            $enum::ClassAttributeUnderClass($inner) => $body,
            $enum::ClassSubjectUnderClass($inner) => $body,
            $enum::MegaItem($inner) => $body,
        }
    };
}

/// One entity of any variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "ItemType")]
pub enum Item {
    Year(Year),
    Teacher(Teacher),
    Semester(Semester),
    Class(Class),
    Task(Task),
    Homework(Homework),
    Exam(Exam),
    WeightCategory(WeightCategory),
    Schedule(Schedule),
    Grade(Grade),
    TeacherUnderSchedule(TeacherUnderSchedule),
    ClassAttribute(ClassAttribute),
    ClassSubject(ClassSubject),
    ClassAttributeUnderClass(ClassAttributeUnderClass),
    ClassSubjectUnderClass(ClassSubjectUnderClass),
    MegaItem(MegaItem),
}

impl Item {
    /// An entity of `item_type` with every field at its documented default and a nil
    /// identifier. Field diffs are overlaid on this when the entity is new.
    pub fn default_for(item_type: ItemType) -> Item {
        match item_type {
            ItemType::Year => Item::Year(Year::default()),
            ItemType::Teacher => Item::Teacher(Teacher::default()),
            ItemType::Semester => Item::Semester(Semester::default()),
            ItemType::Class => Item::Class(Class::default()),
            ItemType::Task => Item::Task(Task::default()),
            ItemType::Homework => Item::Homework(Homework::default()),
            ItemType::Exam => Item::Exam(Exam::default()),
            ItemType::WeightCategory => Item::WeightCategory(WeightCategory::default()),
            ItemType::Schedule => Item::Schedule(Schedule::default()),
            ItemType::Grade => Item::Grade(Grade::default()),
            ItemType::TeacherUnderSchedule => {
                Item::TeacherUnderSchedule(TeacherUnderSchedule::default())
            }
            ItemType::ClassAttribute => Item::ClassAttribute(ClassAttribute::default()),
            ItemType::ClassSubject => Item::ClassSubject(ClassSubject::default()),
            ItemType::ClassAttributeUnderClass => {
                Item::ClassAttributeUnderClass(ClassAttributeUnderClass::default())
            }
            ItemType::ClassSubjectUnderClass => {
                Item::ClassSubjectUnderClass(ClassSubjectUnderClass::default())
            }
            ItemType::MegaItem => Item::MegaItem(MegaItem::default()),
        }
    }

    pub fn as_entity(&self) -> &dyn Entity {
        each_variant!(self, Item, inner => inner)
    }

    pub fn as_entity_mut(&mut self) -> &mut dyn Entity {
        each_variant!(self, Item, inner => inner)
    }

    pub fn as_item_ref(&self) -> ItemRef<'_> {
        each_variant!(self, Item, inner => inner.into())
    }
}

impl Entity for Item {
    fn item_type(&self) -> ItemType {
        self.as_entity().item_type()
    }

    fn base(&self) -> &BaseFields {
        self.as_entity().base()
    }

    fn base_mut(&mut self) -> &mut BaseFields {
        self.as_entity_mut().base_mut()
    }

    fn level(&self) -> u8 {
        self.as_entity().level()
    }

    fn validate(&self) -> Result<(), ModelError> {
        self.as_entity().validate()
    }

    fn date(&self) -> Option<DateTime<Utc>> {
        self.as_entity().date()
    }

    fn second_upper_identifier(&self) -> Option<Uuid> {
        self.as_entity().second_upper_identifier()
    }
}

/// Borrowed counterpart of [`Item`], yielded by envelope traversal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "ItemType")]
pub enum ItemRef<'a> {
    Year(&'a Year),
    Teacher(&'a Teacher),
    Semester(&'a Semester),
    Class(&'a Class),
    Task(&'a Task),
    Homework(&'a Homework),
    Exam(&'a Exam),
    WeightCategory(&'a WeightCategory),
    Schedule(&'a Schedule),
    Grade(&'a Grade),
    TeacherUnderSchedule(&'a TeacherUnderSchedule),
    ClassAttribute(&'a ClassAttribute),
    ClassSubject(&'a ClassSubject),
    ClassAttributeUnderClass(&'a ClassAttributeUnderClass),
    ClassSubjectUnderClass(&'a ClassSubjectUnderClass),
    MegaItem(&'a MegaItem),
}

impl<'a> ItemRef<'a> {
    pub fn as_entity(&self) -> &'a dyn Entity {
        each_variant!(*self, ItemRef, inner => inner)
    }

    pub fn to_item(&self) -> Item {
        each_variant!(*self, ItemRef, inner => inner.clone().into())
    }
}

macro_rules! item_conversions {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Item {
                fn from(value: $variant) -> Self {
                    Item::$variant(value)
                }
            }

            impl<'a> From<&'a $variant> for ItemRef<'a> {
                fn from(value: &'a $variant) -> Self {
                    ItemRef::$variant(value)
                }
            }
        )*
    };
}

item_conversions!(
    Year,
    Teacher,
    Semester,
    Class,
    Task,
    Homework,
    Exam,
    WeightCategory,
    Schedule,
    Grade,
    TeacherUnderSchedule,
    ClassAttribute,
    ClassSubject,
    ClassAttributeUnderClass,
    ClassSubjectUnderClass,
    MegaItem,
);

/// Order in which planner items are listed to the user.
///
/// Date-bearing items sort by date, ties going to the one updated earlier. Grades sort
/// by date alone, so two grades on the same day compare equal and a stable sort keeps
/// their incoming order.
pub fn compare_for_display(a: &dyn Entity, b: &dyn Entity) -> Ordering {
    let by_date = a.date().cmp(&b.date());
    if by_date != Ordering::Equal {
        return by_date;
    }
    if a.item_type() == ItemType::Grade && b.item_type() == ItemType::Grade {
        return Ordering::Equal;
    }
    a.updated().cmp(&b.updated())
}

pub fn sort_for_display<T: Entity>(items: &mut [T]) {
    items.sort_by(|a, b| compare_for_display(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mega_item::MegaItemType;
    use chrono::{Duration, TimeZone};

    fn due() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_numeric_codes() {
        for (code, kind) in ItemType::ALL.into_iter().enumerate() {
            assert_eq!(kind.code() as usize, code);
        }
        assert_eq!(ItemType::MegaItem.code(), 15);
    }

    #[test]
    fn test_json_carries_variant_name() {
        assert_eq!(
            serde_json::to_value(ItemType::Homework).unwrap(),
            serde_json::json!("Homework")
        );
        let parsed: ItemType = serde_json::from_str("\"TeacherUnderSchedule\"").unwrap();
        assert_eq!(parsed, ItemType::TeacherUnderSchedule);
    }

    #[test]
    fn test_levels() {
        assert_eq!(ItemType::Year.level(), 0);
        assert_eq!(ItemType::Teacher.level(), 0);
        assert_eq!(ItemType::ClassAttribute.level(), 0);
        assert_eq!(ItemType::ClassSubject.level(), 0);
        assert_eq!(ItemType::Semester.level(), 1);
        assert_eq!(ItemType::Class.level(), 2);
        assert_eq!(ItemType::Task.level(), 2);
        assert_eq!(ItemType::Schedule.level(), 3);
        assert_eq!(ItemType::ClassSubjectUnderClass.level(), 3);
        assert_eq!(ItemType::Grade.level(), 4);
        assert_eq!(ItemType::TeacherUnderSchedule.level(), 4);
    }

    #[test]
    fn test_item_level_follows_mega_item_kind() {
        let holiday: Item = MegaItem::new(MegaItemType::Holiday, Uuid::new_v4(), "Break", due()).into();
        let class_time: Item =
            MegaItem::new(MegaItemType::ClassTime, Uuid::new_v4(), "Lecture", due()).into();
        assert_eq!(holiday.level(), 2);
        assert_eq!(class_time.level(), 3);
    }

    #[test]
    fn test_item_type_from_str() {
        assert_eq!("weightcategory".parse::<ItemType>().unwrap(), ItemType::WeightCategory);
        assert_eq!("MegaItem".parse::<ItemType>().unwrap(), ItemType::MegaItem);
        assert!("Flashcard".parse::<ItemType>().is_err());
    }

    #[test]
    fn test_parent_rules() {
        assert!(ItemType::Grade.can_change_parent());
        assert!(!ItemType::Semester.can_change_parent());
        assert!(!ItemType::Schedule.can_change_parent());
        assert!(ItemType::TeacherUnderSchedule.is_link());
        assert!(ItemType::ClassSubject.is_top_level());
    }

    #[test]
    fn test_item_json_is_tagged() {
        let year: Item = Year::new("Freshman").into();
        let json = serde_json::to_value(&year).unwrap();
        assert_eq!(json["ItemType"], "Year");
        assert_eq!(json["Name"], "Freshman");

        let parsed: Item = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, year);
    }

    #[test]
    fn test_unknown_variant_is_rejected() {
        let json = r#"{"ItemType":"Flashcard","Identifier":"00000000-0000-0000-0000-000000000001"}"#;
        assert!(serde_json::from_str::<Item>(json).is_err());
    }

    #[test]
    fn test_roundtrip_keeps_sentinels() {
        let homework: Item = Homework::new(Uuid::new_v4(), "No date", crate::models::dates::no_due_date()).into();
        let json = serde_json::to_string(&homework).unwrap();
        let parsed: Item = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, homework);
        assert_eq!(parsed.date(), Some(crate::models::dates::no_due_date()));
    }

    #[test]
    fn test_item_ref_roundtrip() {
        let class = Class::new(Uuid::new_v4(), "Biology");
        let borrowed = ItemRef::from(&class);
        assert_eq!(borrowed.as_entity().identifier(), class.identifier());
        assert_eq!(borrowed.to_item(), Item::Class(class.clone()));
        assert_eq!(
            serde_json::to_value(borrowed).unwrap(),
            serde_json::to_value(Item::Class(class)).unwrap()
        );
    }

    #[test]
    fn test_default_for_every_type() {
        for kind in ItemType::ALL {
            let item = Item::default_for(kind);
            assert_eq!(item.item_type(), kind);
            assert!(item.identifier().is_nil());
        }
    }

    #[test]
    fn test_display_order_breaks_ties_by_updated() {
        let class_id = Uuid::new_v4();
        let mut a = Homework::new(class_id, "A", due());
        let mut b = Homework::new(class_id, "B", due());
        a.base.updated = due() - Duration::hours(2);
        b.base.updated = due() - Duration::hours(1);

        let mut items: Vec<Item> = vec![b.into(), a.into()];
        sort_for_display(&mut items);

        assert!(items.iter().all(|item| item.level() == 3));
        let names: Vec<_> = items
            .iter()
            .map(|item| match item {
                Item::Homework(homework) => homework.name.name.clone(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_grades_ignore_updated() {
        let category = Uuid::new_v4();
        let mut first = Grade::new(category, "First", due());
        let mut second = Grade::new(category, "Second", due());
        first.base.updated = due();
        second.base.updated = due() - Duration::days(3);

        assert_eq!(compare_for_display(&first, &second), Ordering::Equal);

        let mut grades = vec![first, second];
        sort_for_display(&mut grades);
        assert_eq!(grades[0].name.name, "First");

        let earlier = Grade::new(category, "Earlier", due() - Duration::days(1));
        assert_eq!(compare_for_display(&earlier, &grades[0]), Ordering::Less);
    }
}
