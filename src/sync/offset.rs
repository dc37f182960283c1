//! Clock-offset correction.
//!
//! A device whose clock is off reports `offset = server clock - device clock`. The
//! server shifts every `Updated` and `DateCreated` it receives by `+offset` and every
//! timestamp it sends back by `-offset`, so relative order is preserved across devices.
//! Sentinels are shifted like any other value, which keeps `o` then `-o` exact.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use super::envelope::UpdatedItems;
use super::protocol::{DeletedItem, ItemUpdate, SyncRequest, SyncResponse};
use crate::models::dates;
use crate::models::Entity;

/// Columns carrying clock-dependent timestamps.
const SHIFTED_COLUMNS: [&str; 2] = ["Updated", "DateCreated"];

fn shift(date: DateTime<Utc>, offset_ms: i64) -> DateTime<Utc> {
    match Duration::try_milliseconds(offset_ms).and_then(|delta| date.checked_add_signed(delta)) {
        Some(shifted) => shifted,
        None => {
            tracing::warn!(
                "Clock offset {}ms overflows {}, leaving it unchanged",
                offset_ms,
                dates::format_wall_clock(&date)
            );
            date
        }
    }
}

pub fn shift_entity(entity: &mut dyn Entity, offset_ms: i64) {
    if offset_ms == 0 {
        return;
    }
    let base = entity.base_mut();
    base.updated = shift(base.updated, offset_ms);
    base.date_created = shift(base.date_created, offset_ms);
}

pub fn shift_envelope(envelope: &mut UpdatedItems, offset_ms: i64) {
    if offset_ms == 0 {
        return;
    }
    envelope.for_each_entity_mut(|entity| shift_entity(entity, offset_ms));
}

pub fn shift_tombstones(deleted: &mut [DeletedItem], offset_ms: i64) {
    if offset_ms == 0 {
        return;
    }
    for tombstone in deleted {
        tombstone.deleted_on = shift(tombstone.deleted_on, offset_ms);
    }
}

/// Shifts the timestamp columns a field diff carries. Columns that don't parse are
/// left for validation to reject.
pub fn shift_update(update: &mut ItemUpdate, offset_ms: i64) {
    if offset_ms == 0 {
        return;
    }
    for column in SHIFTED_COLUMNS {
        let Some(Value::String(raw)) = update.fields.get_mut(column) else {
            continue;
        };
        if let Ok(date) = dates::parse_wall_clock(raw) {
            *raw = dates::format_wall_clock(&shift(date, offset_ms));
        }
    }
}

impl SyncRequest {
    /// Moves pushed timestamps from device time to server time.
    pub fn apply_offset(&mut self, offset_ms: i64) {
        for update in &mut self.updates {
            shift_update(update, offset_ms);
        }
    }
}

impl SyncResponse {
    /// Moves returned timestamps from server time to device time.
    pub fn apply_offset(&mut self, offset_ms: i64) {
        let Some(inverse) = offset_ms.checked_neg() else {
            tracing::warn!("Clock offset {}ms cannot be inverted, ignoring it", offset_ms);
            return;
        };
        shift_envelope(&mut self.updated_items, inverse);
        shift_tombstones(&mut self.deleted_items, inverse);
    }
}
