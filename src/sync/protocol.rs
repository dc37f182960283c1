//! Request and response messages of the delta sync protocol.
//!
//! Every message is JSON with PascalCase field names. Missing fields take their
//! defaults so older peers can omit fields added later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::envelope::UpdatedItems;
use super::error::{AccountError, EnvelopeError, UpdateError};
use super::settings::SyncedSettings;
use crate::models::dates::{self, wall_clock};
use crate::models::{Item, ItemType, MegaItemType};

/// Largest page a client may ask for.
pub const MAX_ITEMS_TO_RETURN: u32 = i32::MAX as u32;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LoginCredentials {
    /// 0 when unknown.
    pub account_id: i64,
    pub username: String,
    pub token: String,
}

impl LoginCredentials {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            account_id: 0,
            username: username.into(),
            token: token.into(),
        }
    }

    pub fn with_account_id(mut self, account_id: i64) -> Self {
        self.account_id = account_id;
        self
    }

    /// Checks that the required parts are present.
    pub fn check(&self) -> Result<(), AccountError> {
        if self.username.trim().is_empty() {
            return Err(AccountError::NoUsername);
        }
        if self.token.is_empty() {
            return Err(AccountError::NoPassword);
        }
        Ok(())
    }
}

/// Tombstone of a deleted entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeletedItem {
    pub identifier: Uuid,
    #[serde(with = "wall_clock")]
    pub deleted_on: DateTime<Utc>,
}

impl DeletedItem {
    pub fn new(identifier: Uuid, deleted_on: DateTime<Utc>) -> Self {
        Self {
            identifier,
            deleted_on,
        }
    }
}

/// Changed columns of one entity, keyed by wire field name.
///
/// Columns left out keep their stored value, or their default for a new entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemUpdate {
    pub item_type: ItemType,
    pub identifier: Uuid,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ItemUpdate {
    pub fn new(item_type: ItemType, identifier: Uuid) -> Self {
        Self {
            item_type,
            identifier,
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, column: impl Into<String>, value: Value) -> Self {
        self.fields.insert(column.into(), value);
        self
    }

    /// Diff carrying every column of `item`.
    pub fn from_item(item: &Item) -> Result<Self, EnvelopeError> {
        use crate::models::Entity;

        let field_diff = |source: serde_json::Error| EnvelopeError::FieldDiff {
            item_type: item.item_type(),
            identifier: item.identifier(),
            source,
        };
        let mut fields = match serde_json::to_value(item).map_err(field_diff)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        fields.remove("ItemType");
        fields.remove("Identifier");

        Ok(Self {
            item_type: item.item_type(),
            identifier: item.identifier(),
            fields,
        })
    }

    /// Overlays the changed columns on `existing`, or on a default entity of the
    /// update's type when there is none.
    pub fn apply_to(&self, existing: Option<&Item>) -> Result<Item, EnvelopeError> {
        let field_diff = |source: serde_json::Error| EnvelopeError::FieldDiff {
            item_type: self.item_type,
            identifier: self.identifier,
            source,
        };

        let base = existing
            .cloned()
            .unwrap_or_else(|| Item::default_for(self.item_type));
        let mut merged = match serde_json::to_value(&base).map_err(field_diff)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        for (column, value) in &self.fields {
            merged.insert(column.clone(), value.clone());
        }
        merged.insert(
            "ItemType".to_string(),
            Value::String(self.item_type.to_string()),
        );
        merged.insert(
            "Identifier".to_string(),
            Value::String(self.identifier.to_string()),
        );

        serde_json::from_value(Value::Object(merged)).map_err(field_diff)
    }
}

/// What a device sends on every sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SyncRequest {
    pub login: LoginCredentials,
    pub device_id: i64,
    pub updates: Vec<ItemUpdate>,
    pub deletes: Vec<Uuid>,
    pub re_sync_needed_for: Vec<ItemType>,
    pub mega_item_re_sync_needed_for: Vec<MegaItemType>,
    /// Cursor of the last completed sync; 0 the first time.
    pub current_change_number: u64,
    pub push_channel: String,
    pub platform: String,
    pub app_name: String,
    pub app_version: String,
    pub sync_version: u32,
    pub max_items_to_return: u32,
    /// Token of the page to fetch, from the previous response.
    pub page: Option<String>,
    pub current_default_grade_scale_index: Option<i64>,
    /// Server clock minus device clock, in milliseconds.
    pub offset: i64,
}

impl Default for SyncRequest {
    fn default() -> Self {
        Self {
            login: LoginCredentials::default(),
            device_id: 0,
            updates: Vec::new(),
            deletes: Vec::new(),
            re_sync_needed_for: Vec::new(),
            mega_item_re_sync_needed_for: Vec::new(),
            current_change_number: 0,
            push_channel: String::new(),
            platform: String::new(),
            app_name: String::new(),
            app_version: String::new(),
            sync_version: 0,
            max_items_to_return: MAX_ITEMS_TO_RETURN,
            page: None,
            current_default_grade_scale_index: None,
            offset: 0,
        }
    }
}

impl SyncRequest {
    pub fn new(login: LoginCredentials, device_id: i64) -> Self {
        Self {
            login,
            device_id,
            ..Self::default()
        }
    }

    pub fn with_updates(mut self, updates: Vec<ItemUpdate>) -> Self {
        self.updates = updates;
        self
    }

    pub fn with_deletes(mut self, deletes: Vec<Uuid>) -> Self {
        self.deletes = deletes;
        self
    }

    pub fn with_max_items(mut self, max_items_to_return: u32) -> Self {
        self.max_items_to_return = max_items_to_return;
        self
    }

    pub fn with_sync_version(mut self, sync_version: u32) -> Self {
        self.sync_version = sync_version;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// What the server answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SyncResponse {
    /// New cursor. Only meaningful once [`next_page`](Self::next_page) is empty.
    pub change_number: u64,
    /// Present only when the account's default grade scale changed.
    pub default_grade_scale_index: Option<i64>,
    pub updated_items: UpdatedItems,
    pub deleted_items: Vec<DeletedItem>,
    pub settings: Option<SyncedSettings>,
    #[serde(with = "wall_clock")]
    pub premium_account_expires_on: DateTime<Utc>,
    pub update_errors: Vec<UpdateError>,
    pub next_page: Option<String>,
    /// The request's offset, echoed back.
    pub offset: i64,
    pub error: Option<AccountError>,
}

impl Default for SyncResponse {
    fn default() -> Self {
        Self {
            change_number: 0,
            default_grade_scale_index: None,
            updated_items: UpdatedItems::default(),
            deleted_items: Vec::new(),
            settings: None,
            premium_account_expires_on: dates::unassigned(),
            update_errors: Vec::new(),
            next_page: None,
            offset: 0,
            error: None,
        }
    }
}

impl SyncResponse {
    pub fn failed(error: AccountError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// True when no further page needs to be fetched.
    pub fn is_final_page(&self) -> bool {
        self.next_page.as_deref().map_or(true, str::is_empty)
    }

    /// Errors reported for `identifier`; an identifier without errors was applied.
    pub fn errors_for(&self, identifier: Uuid) -> impl Iterator<Item = &UpdateError> {
        self.update_errors
            .iter()
            .filter(move |error| error.identifier == identifier)
    }
}

/// Settings-only sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SyncSettingsRequest {
    pub login: LoginCredentials,
    pub settings: SyncedSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SyncSettingsResponse {
    /// The device stores this and sends it with its next regular sync.
    pub default_grade_scale_index: i64,
    pub error: Option<AccountError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entity, Homework};
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_login_check() {
        assert!(LoginCredentials::new("ada", "token").check().is_ok());
        assert_eq!(
            LoginCredentials::new("", "token").check(),
            Err(AccountError::NoUsername)
        );
        assert_eq!(
            LoginCredentials::new("ada", "").check(),
            Err(AccountError::NoPassword)
        );
    }

    #[test]
    fn test_item_update_wire_shape() {
        let id = Uuid::new_v4();
        let update = ItemUpdate::new(ItemType::Homework, id).with_field("Name", json!("Essay"));
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["ItemType"], "Homework");
        assert_eq!(value["Identifier"], id.to_string());
        assert_eq!(value["Name"], "Essay");

        let parsed: ItemUpdate = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, update);
    }

    #[test]
    fn test_apply_to_new_item_uses_defaults() {
        let id = Uuid::new_v4();
        let class_id = Uuid::new_v4();
        let update = ItemUpdate::new(ItemType::Homework, id)
            .with_field("UpperIdentifier", json!(class_id))
            .with_field("Name", json!("Read chapter 4"));

        match update.apply_to(None).unwrap() {
            Item::Homework(homework) => {
                assert_eq!(homework.identifier(), id);
                assert_eq!(homework.upper_identifier(), class_id);
                assert_eq!(homework.name.name, "Read chapter 4");
                assert_eq!(homework.graded.date, dates::no_due_date());
                assert_eq!(homework.percent_complete, 0.0);
            }
            other => panic!("Expected Homework, got {:?}", other),
        }
    }

    #[test]
    fn test_apply_to_existing_keeps_untouched_columns() {
        let date = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        let homework = Homework::new(Uuid::new_v4(), "Lab", date).with_percent_complete(0.25);
        let existing = Item::Homework(homework.clone());

        let update = ItemUpdate::new(ItemType::Homework, homework.identifier())
            .with_field("PercentComplete", json!(1.0));

        match update.apply_to(Some(&existing)).unwrap() {
            Item::Homework(updated) => {
                assert_eq!(updated.percent_complete, 1.0);
                assert_eq!(updated.name.name, "Lab");
                assert_eq!(updated.graded.date, date);
            }
            other => panic!("Expected Homework, got {:?}", other),
        }
    }

    #[test]
    fn test_apply_to_rejects_bad_column_type() {
        let update = ItemUpdate::new(ItemType::Homework, Uuid::new_v4())
            .with_field("PercentComplete", json!("half"));
        assert!(matches!(
            update.apply_to(None),
            Err(EnvelopeError::FieldDiff { .. })
        ));
    }

    #[test]
    fn test_from_item_roundtrip() {
        let item = Item::Homework(Homework::new(Uuid::new_v4(), "Essay", dates::no_due_date()));
        let update = ItemUpdate::from_item(&item).unwrap();
        assert!(!update.fields.contains_key("ItemType"));
        assert_eq!(update.apply_to(None).unwrap(), item);
    }

    #[test]
    fn test_request_defaults() {
        let request: SyncRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.current_change_number, 0);
        assert_eq!(request.max_items_to_return, MAX_ITEMS_TO_RETURN);
        assert!(request.page.is_none());
        assert_eq!(request.offset, 0);
    }

    #[test]
    fn test_response_final_page() {
        let mut response = SyncResponse::default();
        assert!(response.is_final_page());
        response.next_page = Some(String::new());
        assert!(response.is_final_page());
        response.next_page = Some("abc".to_string());
        assert!(!response.is_final_page());
    }

    #[test]
    fn test_response_roundtrip() {
        let mut response = SyncResponse {
            change_number: 42,
            premium_account_expires_on: dates::lifetime_premium(),
            ..SyncResponse::default()
        };
        response
            .deleted_items
            .push(DeletedItem::new(Uuid::new_v4(), dates::unassigned()));
        response.updated_items.add(
            Item::Homework(Homework::new(Uuid::new_v4(), "Essay", dates::no_due_date())),
            false,
        );

        let json = serde_json::to_string(&response).unwrap();
        let parsed: SyncResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, response);
    }

    #[test]
    fn test_response_with_unknown_bucket_fails() {
        let json = r#"{"ChangeNumber":1,"UpdatedItems":{"Flashcards":[]}}"#;
        assert!(serde_json::from_str::<SyncResponse>(json).is_err());
    }
}
