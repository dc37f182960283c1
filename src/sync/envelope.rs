//! Variant-bucketed batch of entities exchanged during a sync.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use uuid::Uuid;

use super::error::EnvelopeError;
use crate::models::{
    Class, ClassAttribute, ClassAttributeUnderClass, ClassSubject, ClassSubjectUnderClass,
    Entity, Exam, Grade, Homework, Item, ItemRef, ItemType, MegaItem, Schedule, Semester, Task,
    Teacher, TeacherUnderSchedule, WeightCategory, Year,
};

/// Position of one entity: its bucket and index within it.
#[derive(Debug, Clone, Copy)]
struct Slot {
    bucket: ItemType,
    index: usize,
}

/// Level-ordered traversal plan, computed on first use and dropped by every mutation.
#[derive(Default)]
struct SequencePlan(OnceLock<Vec<Slot>>);

impl SequencePlan {
    fn reset(&mut self) {
        self.0 = OnceLock::new();
    }
}

impl Clone for SequencePlan {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl PartialEq for SequencePlan {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl fmt::Debug for SequencePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.get() {
            Some(plan) => write!(f, "SequencePlan({} slots)", plan.len()),
            None => write!(f, "SequencePlan(pending)"),
        }
    }
}

/// Entities of every variant, one bucket per variant, in insertion order.
///
/// An unknown bucket on the wire fails decoding of the whole envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default, deny_unknown_fields)]
pub struct UpdatedItems {
    years: Vec<Year>,
    teachers: Vec<Teacher>,
    class_attributes: Vec<ClassAttribute>,
    class_subjects: Vec<ClassSubject>,
    semesters: Vec<Semester>,
    classes: Vec<Class>,
    tasks: Vec<Task>,
    mega_items: Vec<MegaItem>,
    homeworks: Vec<Homework>,
    exams: Vec<Exam>,
    schedules: Vec<Schedule>,
    weight_categories: Vec<WeightCategory>,
    class_attribute_under_classes: Vec<ClassAttributeUnderClass>,
    class_subject_under_classes: Vec<ClassSubjectUnderClass>,
    grades: Vec<Grade>,
    teacher_under_schedules: Vec<TeacherUnderSchedule>,
    #[serde(skip)]
    plan: SequencePlan,
}

fn push<T: Entity>(bucket: &mut Vec<T>, entity: T, dedupe: bool) -> bool {
    if dedupe
        && bucket
            .iter()
            .any(|existing| existing.identifier() == entity.identifier())
    {
        return false;
    }
    bucket.push(entity);
    true
}

fn extend_plan(plan: &mut Vec<Slot>, bucket: ItemType, len: usize) {
    plan.extend((0..len).map(|index| Slot { bucket, index }));
}

impl UpdatedItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes an envelope. Any unrecognized variant rejects the whole envelope.
    pub fn from_json(json: &str) -> Result<Self, EnvelopeError> {
        serde_json::from_str(json).map_err(EnvelopeError::Decode)
    }

    /// Routes `item` into its bucket. With `dedupe`, an item whose identifier is
    /// already in that bucket is dropped and `false` is returned.
    pub fn add(&mut self, item: Item, dedupe: bool) -> bool {
        self.plan.reset();
        match item {
            Item::Year(e) => push(&mut self.years, e, dedupe),
            Item::Teacher(e) => push(&mut self.teachers, e, dedupe),
            Item::Semester(e) => push(&mut self.semesters, e, dedupe),
            Item::Class(e) => push(&mut self.classes, e, dedupe),
            Item::Task(e) => push(&mut self.tasks, e, dedupe),
            Item::Homework(e) => push(&mut self.homeworks, e, dedupe),
            Item::Exam(e) => push(&mut self.exams, e, dedupe),
            Item::WeightCategory(e) => push(&mut self.weight_categories, e, dedupe),
            Item::Schedule(e) => push(&mut self.schedules, e, dedupe),
            Item::Grade(e) => push(&mut self.grades, e, dedupe),
            Item::TeacherUnderSchedule(e) => push(&mut self.teacher_under_schedules, e, dedupe),
            Item::ClassAttribute(e) => push(&mut self.class_attributes, e, dedupe),
            Item::ClassSubject(e) => push(&mut self.class_subjects, e, dedupe),
            Item::ClassAttributeUnderClass(e) => {
                push(&mut self.class_attribute_under_classes, e, dedupe)
            }
            Item::ClassSubjectUnderClass(e) => {
                push(&mut self.class_subject_under_classes, e, dedupe)
            }
            Item::MegaItem(e) => push(&mut self.mega_items, e, dedupe),
        }
    }

    pub fn add_all(&mut self, items: impl IntoIterator<Item = Item>) {
        for item in items {
            self.add(item, false);
        }
    }

    pub fn add_all_deduped(&mut self, items: impl IntoIterator<Item = Item>) {
        for item in items {
            self.add(item, true);
        }
    }

    /// Appends every bucket of `other` except mega items and grades, without
    /// de-duplication.
    pub fn merge_all_except_volatile(&mut self, other: &UpdatedItems) {
        self.plan.reset();
        self.years.extend_from_slice(&other.years);
        self.teachers.extend_from_slice(&other.teachers);
        self.class_attributes.extend_from_slice(&other.class_attributes);
        self.class_subjects.extend_from_slice(&other.class_subjects);
        self.semesters.extend_from_slice(&other.semesters);
        self.classes.extend_from_slice(&other.classes);
        self.tasks.extend_from_slice(&other.tasks);
        self.homeworks.extend_from_slice(&other.homeworks);
        self.exams.extend_from_slice(&other.exams);
        self.schedules.extend_from_slice(&other.schedules);
        self.weight_categories.extend_from_slice(&other.weight_categories);
        self.class_attribute_under_classes
            .extend_from_slice(&other.class_attribute_under_classes);
        self.class_subject_under_classes
            .extend_from_slice(&other.class_subject_under_classes);
        self.teacher_under_schedules
            .extend_from_slice(&other.teacher_under_schedules);
    }

    /// Merges only the mega items of `other`, skipping identifiers already present.
    pub fn merge_volatile_deduped(&mut self, other: &UpdatedItems) {
        self.plan.reset();
        for mega_item in &other.mega_items {
            push(&mut self.mega_items, mega_item.clone(), true);
        }
    }

    /// All entities by ascending level. Restartable; the ordering plan is computed
    /// once per unmodified envelope.
    pub fn as_sequence(&self) -> impl Iterator<Item = ItemRef<'_>> + '_ {
        self.plan
            .0
            .get_or_init(|| self.build_plan())
            .iter()
            .filter_map(move |slot| self.resolve(*slot))
    }

    /// Owned copy of [`as_sequence`](Self::as_sequence).
    pub fn to_items(&self) -> Vec<Item> {
        self.as_sequence().map(|item| item.to_item()).collect()
    }

    fn build_plan(&self) -> Vec<Slot> {
        let mut plan = Vec::with_capacity(self.len());

        // Level 0
        extend_plan(&mut plan, ItemType::Year, self.years.len());
        extend_plan(&mut plan, ItemType::Teacher, self.teachers.len());
        extend_plan(&mut plan, ItemType::ClassAttribute, self.class_attributes.len());
        extend_plan(&mut plan, ItemType::ClassSubject, self.class_subjects.len());

        // Level 1
        extend_plan(&mut plan, ItemType::Semester, self.semesters.len());

        // Level 2
        extend_plan(&mut plan, ItemType::Class, self.classes.len());
        extend_plan(&mut plan, ItemType::Task, self.tasks.len());
        self.extend_plan_with_mega_items(&mut plan, 2);

        // Level 3
        self.extend_plan_with_mega_items(&mut plan, 3);
        extend_plan(&mut plan, ItemType::Homework, self.homeworks.len());
        extend_plan(&mut plan, ItemType::Exam, self.exams.len());
        extend_plan(&mut plan, ItemType::Schedule, self.schedules.len());
        extend_plan(&mut plan, ItemType::WeightCategory, self.weight_categories.len());
        extend_plan(
            &mut plan,
            ItemType::ClassAttributeUnderClass,
            self.class_attribute_under_classes.len(),
        );
        extend_plan(
            &mut plan,
            ItemType::ClassSubjectUnderClass,
            self.class_subject_under_classes.len(),
        );

        // Level 4
        extend_plan(&mut plan, ItemType::Grade, self.grades.len());
        extend_plan(
            &mut plan,
            ItemType::TeacherUnderSchedule,
            self.teacher_under_schedules.len(),
        );

        plan
    }

    fn extend_plan_with_mega_items(&self, plan: &mut Vec<Slot>, level: u8) {
        plan.extend(
            self.mega_items
                .iter()
                .enumerate()
                .filter(|(_, mega_item)| mega_item.level() == level)
                .map(|(index, _)| Slot {
                    bucket: ItemType::MegaItem,
                    index,
                }),
        );
    }

    fn resolve(&self, slot: Slot) -> Option<ItemRef<'_>> {
        let index = slot.index;
        let item = match slot.bucket {
            ItemType::Year => ItemRef::Year(self.years.get(index)?),
            ItemType::Teacher => ItemRef::Teacher(self.teachers.get(index)?),
            ItemType::Semester => ItemRef::Semester(self.semesters.get(index)?),
            ItemType::Class => ItemRef::Class(self.classes.get(index)?),
            ItemType::Task => ItemRef::Task(self.tasks.get(index)?),
            ItemType::Homework => ItemRef::Homework(self.homeworks.get(index)?),
            ItemType::Exam => ItemRef::Exam(self.exams.get(index)?),
            ItemType::WeightCategory => {
                ItemRef::WeightCategory(self.weight_categories.get(index)?)
            }
            ItemType::Schedule => ItemRef::Schedule(self.schedules.get(index)?),
            ItemType::Grade => ItemRef::Grade(self.grades.get(index)?),
            ItemType::TeacherUnderSchedule => {
                ItemRef::TeacherUnderSchedule(self.teacher_under_schedules.get(index)?)
            }
            ItemType::ClassAttribute => {
                ItemRef::ClassAttribute(self.class_attributes.get(index)?)
            }
            ItemType::ClassSubject => ItemRef::ClassSubject(self.class_subjects.get(index)?),
            ItemType::ClassAttributeUnderClass => {
                ItemRef::ClassAttributeUnderClass(self.class_attribute_under_classes.get(index)?)
            }
            ItemType::ClassSubjectUnderClass => {
                ItemRef::ClassSubjectUnderClass(self.class_subject_under_classes.get(index)?)
            }
            ItemType::MegaItem => ItemRef::MegaItem(self.mega_items.get(index)?),
        };
        Some(item)
    }

    /// Visits every entity for in-place edits of shared fields.
    pub(crate) fn for_each_entity_mut(&mut self, mut visit: impl FnMut(&mut dyn Entity)) {
        self.plan.reset();
        fn each<T: Entity>(bucket: &mut [T], visit: &mut impl FnMut(&mut dyn Entity)) {
            for entity in bucket {
                visit(entity);
            }
        }
        each(&mut self.years, &mut visit);
        each(&mut self.teachers, &mut visit);
        each(&mut self.class_attributes, &mut visit);
        each(&mut self.class_subjects, &mut visit);
        each(&mut self.semesters, &mut visit);
        each(&mut self.classes, &mut visit);
        each(&mut self.tasks, &mut visit);
        each(&mut self.mega_items, &mut visit);
        each(&mut self.homeworks, &mut visit);
        each(&mut self.exams, &mut visit);
        each(&mut self.schedules, &mut visit);
        each(&mut self.weight_categories, &mut visit);
        each(&mut self.class_attribute_under_classes, &mut visit);
        each(&mut self.class_subject_under_classes, &mut visit);
        each(&mut self.grades, &mut visit);
        each(&mut self.teacher_under_schedules, &mut visit);
    }

    /// Removes and returns the mega item bucket.
    pub fn take_mega_items(&mut self) -> Vec<MegaItem> {
        self.plan.reset();
        std::mem::take(&mut self.mega_items)
    }

    pub fn len(&self) -> usize {
        self.years.len()
            + self.teachers.len()
            + self.class_attributes.len()
            + self.class_subjects.len()
            + self.semesters.len()
            + self.classes.len()
            + self.tasks.len()
            + self.mega_items.len()
            + self.homeworks.len()
            + self.exams.len()
            + self.schedules.len()
            + self.weight_categories.len()
            + self.class_attribute_under_classes.len()
            + self.class_subject_under_classes.len()
            + self.grades.len()
            + self.teacher_under_schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, identifier: Uuid) -> bool {
        self.as_sequence()
            .any(|item| item.as_entity().identifier() == identifier)
    }

    pub fn years(&self) -> &[Year] {
        &self.years
    }

    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    pub fn class_attributes(&self) -> &[ClassAttribute] {
        &self.class_attributes
    }

    pub fn class_subjects(&self) -> &[ClassSubject] {
        &self.class_subjects
    }

    pub fn semesters(&self) -> &[Semester] {
        &self.semesters
    }

    pub fn classes(&self) -> &[Class] {
        &self.classes
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn mega_items(&self) -> &[MegaItem] {
        &self.mega_items
    }

    pub fn homeworks(&self) -> &[Homework] {
        &self.homeworks
    }

    pub fn exams(&self) -> &[Exam] {
        &self.exams
    }

    pub fn schedules(&self) -> &[Schedule] {
        &self.schedules
    }

    pub fn weight_categories(&self) -> &[WeightCategory] {
        &self.weight_categories
    }

    pub fn class_attribute_under_classes(&self) -> &[ClassAttributeUnderClass] {
        &self.class_attribute_under_classes
    }

    pub fn class_subject_under_classes(&self) -> &[ClassSubjectUnderClass] {
        &self.class_subject_under_classes
    }

    pub fn grades(&self) -> &[Grade] {
        &self.grades
    }

    pub fn teacher_under_schedules(&self) -> &[TeacherUnderSchedule] {
        &self.teacher_under_schedules
    }
}

impl FromIterator<Item> for UpdatedItems {
    fn from_iter<I: IntoIterator<Item = Item>>(items: I) -> Self {
        let mut envelope = UpdatedItems::new();
        envelope.add_all(items);
        envelope
    }
}
