//! Serving clients that predate mega items.

use super::envelope::UpdatedItems;
use crate::models::{Entity, Item};

/// Replaces the mega items of `envelope` with their legacy homework and exam shapes.
///
/// Kinds without a legacy shape are dropped. Returns how many were dropped.
pub fn downgrade_envelope(envelope: &mut UpdatedItems) -> usize {
    let mut dropped = 0;
    for mega_item in envelope.take_mega_items() {
        match mega_item.downgrade() {
            Some(item) => {
                envelope.add(item, true);
            }
            None => {
                tracing::debug!(
                    "Omitting {} {} from legacy payload",
                    mega_item.mega_item_type,
                    mega_item.identifier()
                );
                dropped += 1;
            }
        }
    }
    dropped
}

/// Downgrades a single item for a legacy client. Non-mega items pass through.
pub fn downgrade_item(item: Item) -> Option<Item> {
    match item {
        Item::MegaItem(mega_item) => mega_item.downgrade(),
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Class, ItemType, MegaItem, MegaItemType};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn test_downgrade_envelope() {
        let date = Utc.with_ymd_and_hms(2024, 12, 2, 0, 0, 0).unwrap();
        let class = Class::new(Uuid::new_v4(), "Physics");
        let homework = MegaItem::new(MegaItemType::Homework, class.identifier(), "Lab", date)
            .with_percent_complete(0.5);
        let exam = MegaItem::new(MegaItemType::Exam, class.identifier(), "Final", date);
        let holiday = MegaItem::new(MegaItemType::Holiday, Uuid::new_v4(), "Winter break", date);

        let mut envelope: UpdatedItems = vec![
            Item::from(class),
            Item::from(homework.clone()),
            Item::from(exam.clone()),
            Item::from(holiday),
        ]
        .into_iter()
        .collect();

        assert_eq!(downgrade_envelope(&mut envelope), 1);
        assert!(envelope.mega_items().is_empty());
        assert_eq!(envelope.homeworks().len(), 1);
        assert_eq!(envelope.homeworks()[0].identifier(), homework.identifier());
        assert_eq!(envelope.homeworks()[0].percent_complete, 0.5);
        assert_eq!(envelope.exams()[0].identifier(), exam.identifier());

        let kinds: Vec<ItemType> = envelope
            .as_sequence()
            .map(|item| item.as_entity().item_type())
            .collect();
        assert_eq!(kinds, vec![ItemType::Class, ItemType::Homework, ItemType::Exam]);
    }

    #[test]
    fn test_downgrade_item() {
        let date = Utc.with_ymd_and_hms(2024, 12, 2, 0, 0, 0).unwrap();
        let event = MegaItem::new(MegaItemType::Event, Uuid::new_v4(), "Fair", date);
        assert!(downgrade_item(event.into()).is_none());

        let class: Item = Class::new(Uuid::new_v4(), "Art").into();
        assert_eq!(downgrade_item(class.clone()), Some(class));
    }
}
