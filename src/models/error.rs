use thiserror::Error;

use super::item::ItemType;

/// Errors raised while validating or mutating a single entity.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Name is {0} characters long, maximum is 600")]
    NameTooLong(usize),

    #[error("Name must not contain line breaks")]
    NameHasLineBreak,

    #[error("Details are {0} characters long, maximum is 4000")]
    DetailsTooLong(usize),

    #[error("Item has {0} images, maximum is 15")]
    TooManyImages(usize),

    #[error("Invalid image name '{0}', expected <deviceId>-<uniqueNumber>.<format>")]
    InvalidImageName(String),

    #[error("Percent complete {0} is outside 0..=1")]
    PercentCompleteOutOfRange(f64),

    #[error("{0} items cannot move to a different parent")]
    ParentImmutable(ItemType),

    #[error("{0} items need a parent")]
    MissingParent(ItemType),

    #[error("{0} items need a second parent")]
    MissingSecondParent(ItemType),

    #[error("Grades can only move between weight categories of the same class")]
    GradeMovedAcrossClasses,
}
