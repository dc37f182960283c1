//! Reference change feed: the server side of a delta sync.
//!
//! A [`ChangeFeed`] applies what a device pushes, then answers with everything that
//! changed after the device's cursor, one page at a time. Persistence goes through
//! the [`ItemStore`] trait; [`MemoryStore`] keeps everything in memory.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::error::{StoreError, SyncError, UpdateError, UpdateErrorKind};
use super::legacy;
use super::protocol::{
    DeletedItem, ItemUpdate, SyncRequest, SyncResponse, SyncSettingsRequest,
    SyncSettingsResponse,
};
use super::settings::Settings;
use crate::config::SyncConfig;
use crate::models::{dates, Entity, Item, ItemType, ModelError};

/// An entity together with the change number of its last write.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredItem {
    pub item: Item,
    pub change_number: u64,
}

/// A tombstone together with the change number of the delete.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTombstone {
    pub deleted: DeletedItem,
    pub change_number: u64,
}

/// Persistence behind a [`ChangeFeed`].
pub trait ItemStore {
    /// Returns `Ok(None)` if no live entity has this identifier.
    fn get(&self, identifier: Uuid) -> Result<Option<StoredItem>, StoreError>;

    /// Inserts or replaces an entity, stamping it with `change_number`.
    fn put(&mut self, item: Item, change_number: u64) -> Result<(), StoreError>;

    /// Removes an entity. Returns `Ok(None)` if it wasn't stored.
    fn remove(&mut self, identifier: Uuid) -> Result<Option<Item>, StoreError>;

    /// Identifiers of the entities whose first or second parent is `identifier`.
    fn children(&self, identifier: Uuid) -> Result<Vec<Uuid>, StoreError>;

    /// Live entities written after `change_number`, by ascending change number.
    fn changed_since(&self, change_number: u64) -> Result<Vec<StoredItem>, StoreError>;

    /// Every live entity of one variant.
    fn items_of_type(&self, item_type: ItemType) -> Result<Vec<Item>, StoreError>;

    fn record_tombstone(
        &mut self,
        deleted: DeletedItem,
        change_number: u64,
    ) -> Result<(), StoreError>;

    /// Returns `Ok(None)` if the identifier was never deleted.
    fn tombstone(&self, identifier: Uuid) -> Result<Option<DeletedItem>, StoreError>;

    /// Remembers that deleting `root` took `identifier` along.
    fn record_removal(&mut self, identifier: Uuid, root: Uuid) -> Result<(), StoreError>;

    /// Deleted root whose removal took `identifier` along. Returns `Ok(None)` if
    /// `identifier` wasn't removed as a descendant.
    fn removed_with(&self, identifier: Uuid) -> Result<Option<Uuid>, StoreError>;

    /// Tombstones recorded after `change_number`, by ascending change number.
    fn tombstones_since(&self, change_number: u64) -> Result<Vec<StoredTombstone>, StoreError>;
}

/// In-memory [`ItemStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: HashMap<Uuid, StoredItem>,
    tombstones: HashMap<Uuid, StoredTombstone>,
    removed: HashMap<Uuid, Uuid>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ItemStore for MemoryStore {
    fn get(&self, identifier: Uuid) -> Result<Option<StoredItem>, StoreError> {
        Ok(self.items.get(&identifier).cloned())
    }

    fn put(&mut self, item: Item, change_number: u64) -> Result<(), StoreError> {
        self.items.insert(
            item.identifier(),
            StoredItem {
                item,
                change_number,
            },
        );
        Ok(())
    }

    fn remove(&mut self, identifier: Uuid) -> Result<Option<Item>, StoreError> {
        Ok(self.items.remove(&identifier).map(|stored| stored.item))
    }

    fn children(&self, identifier: Uuid) -> Result<Vec<Uuid>, StoreError> {
        Ok(self
            .items
            .values()
            .filter(|stored| {
                stored.item.upper_identifier() == identifier
                    || stored.item.second_upper_identifier() == Some(identifier)
            })
            .map(|stored| stored.item.identifier())
            .collect())
    }

    fn changed_since(&self, change_number: u64) -> Result<Vec<StoredItem>, StoreError> {
        let mut changed: Vec<StoredItem> = self
            .items
            .values()
            .filter(|stored| stored.change_number > change_number)
            .cloned()
            .collect();
        changed.sort_by_key(|stored| stored.change_number);
        Ok(changed)
    }

    fn items_of_type(&self, item_type: ItemType) -> Result<Vec<Item>, StoreError> {
        let mut items: Vec<&StoredItem> = self
            .items
            .values()
            .filter(|stored| stored.item.item_type() == item_type)
            .collect();
        items.sort_by_key(|stored| stored.change_number);
        Ok(items.into_iter().map(|stored| stored.item.clone()).collect())
    }

    fn record_tombstone(
        &mut self,
        deleted: DeletedItem,
        change_number: u64,
    ) -> Result<(), StoreError> {
        self.tombstones.insert(
            deleted.identifier,
            StoredTombstone {
                deleted,
                change_number,
            },
        );
        Ok(())
    }

    fn tombstone(&self, identifier: Uuid) -> Result<Option<DeletedItem>, StoreError> {
        Ok(self
            .tombstones
            .get(&identifier)
            .map(|stored| stored.deleted.clone()))
    }

    fn record_removal(&mut self, identifier: Uuid, root: Uuid) -> Result<(), StoreError> {
        self.removed.insert(identifier, root);
        Ok(())
    }

    fn removed_with(&self, identifier: Uuid) -> Result<Option<Uuid>, StoreError> {
        Ok(self.removed.get(&identifier).copied())
    }

    fn tombstones_since(&self, change_number: u64) -> Result<Vec<StoredTombstone>, StoreError> {
        let mut tombstones: Vec<StoredTombstone> = self
            .tombstones
            .values()
            .filter(|stored| stored.change_number > change_number)
            .cloned()
            .collect();
        tombstones.sort_by_key(|stored| stored.change_number);
        Ok(tombstones)
    }
}

/// Position within a paged sync. Opaque to devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageToken {
    /// Cursor the sync started from.
    since: u64,
    /// Server change number when the first page was served.
    upper: u64,
    /// Change number of the last entity already sent.
    after: u64,
}

impl PageToken {
    fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(format!("{}:{}:{}", self.since, self.upper, self.after))
    }

    fn decode(raw: &str) -> Result<Self, SyncError> {
        let invalid = || SyncError::InvalidPageToken(raw.to_string());

        let bytes = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid())?;
        let text = String::from_utf8(bytes).map_err(|_| invalid())?;
        let parts: Vec<u64> = text
            .split(':')
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| invalid())?;

        match parts.as_slice() {
            &[since, upper, after] if since <= after && after <= upper => Ok(Self {
                since,
                upper,
                after,
            }),
            _ => Err(invalid()),
        }
    }
}

/// A pushed entity that passed field checks and waits for its level's turn.
struct Staged {
    item: Item,
    existing: Option<Item>,
}

/// Server side of the sync protocol for one account.
pub struct ChangeFeed<S = MemoryStore> {
    store: S,
    config: SyncConfig,
    change_number: u64,
    settings: Settings,
    default_grade_scale_index: i64,
    premium_account_expires_on: DateTime<Utc>,
}

impl<S: ItemStore> ChangeFeed<S> {
    pub fn new(config: SyncConfig, store: S) -> Self {
        Self {
            store,
            config,
            change_number: 0,
            settings: Settings::default(),
            default_grade_scale_index: 0,
            premium_account_expires_on: dates::unassigned(),
        }
    }

    pub fn with_premium_expiration(mut self, expires_on: DateTime<Utc>) -> Self {
        self.premium_account_expires_on = expires_on;
        self
    }

    /// Latest change number handed out.
    pub fn change_number(&self) -> u64 {
        self.change_number
    }

    pub fn default_grade_scale_index(&self) -> i64 {
        self.default_grade_scale_index
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one sync round.
    ///
    /// Credential problems come back as a response carrying the account error. A
    /// bad page token or a failing store read aborts the call. Entities that cannot
    /// be applied are reported in `update_errors` while the rest of the batch applies.
    pub fn sync(&mut self, mut request: SyncRequest) -> Result<SyncResponse, SyncError> {
        if let Err(error) = request.login.check() {
            tracing::warn!("Rejected sync from device {}: {}", request.device_id, error);
            return Ok(SyncResponse::failed(error));
        }

        let offset = request.offset;
        request.apply_offset(offset);

        let mut response = SyncResponse::default();
        let paging = request.page.as_deref().filter(|page| !page.is_empty());

        let token = match paging {
            Some(raw) => {
                let token = PageToken::decode(raw)?;
                if token.upper > self.change_number {
                    return Err(SyncError::InvalidPageToken(raw.to_string()));
                }
                if !request.updates.is_empty() || !request.deletes.is_empty() {
                    tracing::warn!(
                        "Ignoring {} update(s) and {} delete(s) sent with a page token",
                        request.updates.len(),
                        request.deletes.len()
                    );
                }
                token
            }
            None => {
                self.apply_deletes(&request.deletes, &mut response)?;
                self.apply_updates(&request.updates, &mut response);
                self.first_page_token(request.current_change_number)
            }
        };

        self.fill_page(&request, token, &mut response)?;

        if paging.is_none() {
            self.add_re_syncs(&request, &mut response)?;
            self.add_settings(&request, &mut response);
        }
        response.premium_account_expires_on = self.premium_account_expires_on;

        if request.sync_version < self.config.mega_item_sync_version {
            let dropped = legacy::downgrade_envelope(&mut response.updated_items);
            if dropped > 0 {
                tracing::debug!(
                    "Dropped {} mega item(s) for device {} on sync version {}",
                    dropped,
                    request.device_id,
                    request.sync_version
                );
            }
        }

        response.apply_offset(offset);
        response.offset = offset;

        tracing::info!(
            "Synced device {}: {} item(s), {} deletion(s), {} error(s)",
            request.device_id,
            response.updated_items.len(),
            response.deleted_items.len(),
            response.update_errors.len()
        );
        Ok(response)
    }

    /// Applies a settings-only change and returns the current grade scale version.
    pub fn sync_settings(
        &mut self,
        request: SyncSettingsRequest,
    ) -> Result<SyncSettingsResponse, SyncError> {
        if let Err(error) = request.login.check() {
            return Ok(SyncSettingsResponse {
                default_grade_scale_index: self.default_grade_scale_index,
                error: Some(error),
            });
        }

        if self.settings.apply(&request.settings) {
            self.default_grade_scale_index += 1;
            tracing::info!(
                "Default grade scale changed, now version {}",
                self.default_grade_scale_index
            );
        }

        Ok(SyncSettingsResponse {
            default_grade_scale_index: self.default_grade_scale_index,
            error: None,
        })
    }

    fn next_change_number(&mut self) -> u64 {
        self.change_number += 1;
        self.change_number
    }

    fn first_page_token(&self, cursor: u64) -> PageToken {
        let since = if cursor > self.change_number {
            tracing::warn!(
                "Device cursor {} is ahead of server change number {}, sending everything",
                cursor,
                self.change_number
            );
            0
        } else {
            cursor
        };
        PageToken {
            since,
            upper: self.change_number,
            after: since,
        }
    }

    fn apply_deletes(
        &mut self,
        deletes: &[Uuid],
        response: &mut SyncResponse,
    ) -> Result<(), SyncError> {
        let deleted_on = Utc::now();
        for &identifier in deletes {
            if identifier.is_nil() {
                response
                    .update_errors
                    .push(UpdateError::new(identifier, UpdateErrorKind::IdentifierEmpty));
                continue;
            }
            if self.store.tombstone(identifier)?.is_some() {
                continue;
            }
            if let Err(err) = self.delete_subtree(identifier, deleted_on) {
                tracing::error!("Failed to delete {}: {}", identifier, err);
                response
                    .update_errors
                    .push(UpdateError::new(identifier, err.into()));
            }
        }
        Ok(())
    }

    /// Removes `root` and everything under it. Only `root` gets a tombstone;
    /// receivers cascade on their own.
    fn delete_subtree(&mut self, root: Uuid, deleted_on: DateTime<Utc>) -> Result<(), StoreError> {
        let mut pending = vec![root];
        let mut seen = HashSet::new();
        let mut removed = 0;
        while let Some(identifier) = pending.pop() {
            if !seen.insert(identifier) {
                continue;
            }
            pending.extend(self.store.children(identifier)?);
            if self.store.remove(identifier)?.is_some() {
                removed += 1;
                if identifier != root {
                    self.store.record_removal(identifier, root)?;
                }
            }
        }

        let change_number = self.next_change_number();
        self.store
            .record_tombstone(DeletedItem::new(root, deleted_on), change_number)?;
        tracing::debug!("Deleted {}, removing {} item(s)", root, removed);
        Ok(())
    }

    fn apply_updates(&mut self, updates: &[ItemUpdate], response: &mut SyncResponse) {
        let (updates, conflicts) = fold_updates(updates);
        for conflict in conflicts {
            tracing::warn!("Rejected update of {}: {}", conflict.identifier, conflict.error);
            response.update_errors.push(conflict);
        }

        let mut staged = Vec::with_capacity(updates.len());
        for update in &updates {
            match self.stage(update, response) {
                Ok(Some(entry)) => staged.push(entry),
                Ok(None) => {}
                Err(kind) => {
                    tracing::warn!("Rejected update of {}: {}", update.identifier, kind);
                    response
                        .update_errors
                        .push(UpdateError::new(update.identifier, kind));
                }
            }
        }

        // Parents first, so checks that look up a parent see this batch's writes.
        staged.sort_by_key(|entry| entry.item.level());

        for entry in staged {
            let identifier = entry.item.identifier();
            if let Err(kind) = self.commit(entry, response) {
                tracing::warn!("Rejected update of {}: {}", identifier, kind);
                response
                    .update_errors
                    .push(UpdateError::new(identifier, kind));
            }
        }
    }

    /// Field-level checks. `Ok(None)` means the entity was deleted and its
    /// tombstone has been echoed instead.
    fn stage(
        &self,
        update: &ItemUpdate,
        response: &mut SyncResponse,
    ) -> Result<Option<Staged>, UpdateErrorKind> {
        if update.identifier.is_nil() {
            return Err(UpdateErrorKind::IdentifierEmpty);
        }

        if let Some(tombstone) = self.covering_tombstone(update.identifier)? {
            echo_tombstone(response, tombstone);
            return Ok(None);
        }

        let existing = self.store.get(update.identifier)?.map(|stored| stored.item);
        if let Some(existing) = &existing {
            if existing.item_type() != update.item_type {
                return Err(UpdateErrorKind::InvalidField(format!(
                    "{} is stored as {}, not {}",
                    update.identifier,
                    existing.item_type(),
                    update.item_type
                )));
            }
        }

        let item = update
            .apply_to(existing.as_ref())
            .map_err(|err| UpdateErrorKind::InvalidField(err.to_string()))?;

        let item_type = item.item_type();
        if !item_type.is_top_level() && item.upper_identifier().is_nil() {
            return Err(UpdateErrorKind::InvalidField(
                ModelError::MissingParent(item_type).to_string(),
            ));
        }
        if item.second_upper_identifier() == Some(Uuid::nil()) {
            return Err(UpdateErrorKind::InvalidField(
                ModelError::MissingSecondParent(item_type).to_string(),
            ));
        }

        self.check_dates(&item)?;
        item.validate()
            .map_err(|err| UpdateErrorKind::InvalidField(err.to_string()))?;

        Ok(Some(Staged { item, existing }))
    }

    /// Tombstone that covers `identifier`: its own, or that of the deleted ancestor
    /// whose removal took it along.
    fn covering_tombstone(&self, identifier: Uuid) -> Result<Option<DeletedItem>, StoreError> {
        if let Some(tombstone) = self.store.tombstone(identifier)? {
            return Ok(Some(tombstone));
        }
        match self.store.removed_with(identifier)? {
            Some(root) => self.store.tombstone(root),
            None => Ok(None),
        }
    }

    fn check_dates(&self, item: &Item) -> Result<(), UpdateErrorKind> {
        let min = self.config.min_persisted_date;
        let max = self.config.max_persisted_date;
        if item.updated() < min {
            return Err(UpdateErrorKind::UpdatedBelowMinSqlDate);
        }
        if item.updated() > max {
            return Err(UpdateErrorKind::UpdatedAboveMaxSqlDate);
        }
        if item.date_created() < min {
            return Err(UpdateErrorKind::DateCreatedBelowMinSqlDate);
        }
        if item.date_created() > max {
            return Err(UpdateErrorKind::DateCreatedAboveMaxSqlDate);
        }
        Ok(())
    }

    /// Writes a staged entity once its parents are known to be live. An entity
    /// whose parent was deleted is dropped and the covering tombstone echoed.
    fn commit(
        &mut self,
        entry: Staged,
        response: &mut SyncResponse,
    ) -> Result<(), UpdateErrorKind> {
        if let Some(existing) = &entry.existing {
            self.check_parent_change(existing, &entry.item)?;
        }

        let item = &entry.item;
        let existing = entry.existing.as_ref();
        let mut parents = Vec::with_capacity(2);
        if !item.item_type().is_top_level() {
            parents.push((
                item.upper_identifier(),
                existing.map(|existing| existing.upper_identifier()),
            ));
        }
        if let Some(second) = item.second_upper_identifier() {
            parents.push((
                second,
                existing.and_then(|existing| existing.second_upper_identifier()),
            ));
        }

        for (parent, previous) in parents {
            if previous == Some(parent) || self.store.get(parent)?.is_some() {
                continue;
            }
            if let Some(tombstone) = self.covering_tombstone(parent)? {
                tracing::debug!(
                    "Dropping update of {}: parent {} was deleted",
                    item.identifier(),
                    parent
                );
                echo_tombstone(response, tombstone);
                return Ok(());
            }
            return Err(UpdateErrorKind::InvalidField(format!(
                "Parent {} of {} does not exist",
                parent,
                item.identifier()
            )));
        }

        let change_number = self.next_change_number();
        self.store.put(entry.item, change_number)?;
        Ok(())
    }

    fn check_parent_change(&self, existing: &Item, item: &Item) -> Result<(), UpdateErrorKind> {
        if existing.upper_identifier() == item.upper_identifier() {
            return Ok(());
        }

        let item_type = item.item_type();
        if !item_type.can_change_parent() {
            return Err(UpdateErrorKind::InvalidParentChange(
                ModelError::ParentImmutable(item_type).to_string(),
            ));
        }

        if item_type == ItemType::Grade {
            let from = self.class_of_weight_category(existing.upper_identifier())?;
            let to = self.class_of_weight_category(item.upper_identifier())?;
            if let (Some(from), Some(to)) = (from, to) {
                if from != to {
                    return Err(UpdateErrorKind::InvalidParentChange(
                        ModelError::GradeMovedAcrossClasses.to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    fn class_of_weight_category(&self, identifier: Uuid) -> Result<Option<Uuid>, UpdateErrorKind> {
        Ok(match self.store.get(identifier)? {
            Some(StoredItem {
                item: Item::WeightCategory(category),
                ..
            }) => Some(category.upper_identifier()),
            _ => None,
        })
    }

    fn fill_page(
        &self,
        request: &SyncRequest,
        token: PageToken,
        response: &mut SyncResponse,
    ) -> Result<(), SyncError> {
        let page_size = request
            .max_items_to_return
            .min(self.config.max_items_per_page)
            .max(1) as usize;

        let changed: Vec<StoredItem> = self
            .store
            .changed_since(token.after)?
            .into_iter()
            .filter(|stored| stored.change_number <= token.upper)
            .collect();

        let has_more = changed.len() > page_size;
        let mut last_sent = token.after;
        for stored in changed.into_iter().take(page_size) {
            last_sent = stored.change_number;
            response.updated_items.add(stored.item, false);
        }

        if has_more {
            response.next_page = Some(
                PageToken {
                    after: last_sent,
                    ..token
                }
                .encode(),
            );
            response.change_number = request.current_change_number;
            return Ok(());
        }

        for stored in self.store.tombstones_since(token.since)? {
            if stored.change_number > token.upper {
                break;
            }
            echo_tombstone(response, stored.deleted);
        }
        response.change_number = token.upper;
        Ok(())
    }

    fn add_re_syncs(
        &self,
        request: &SyncRequest,
        response: &mut SyncResponse,
    ) -> Result<(), SyncError> {
        for &item_type in &request.re_sync_needed_for {
            let items = self.store.items_of_type(item_type)?;
            tracing::debug!("Re-sending {} {}(s)", items.len(), item_type);
            response.updated_items.add_all_deduped(items);
        }

        if !request.mega_item_re_sync_needed_for.is_empty() {
            let mega_items = self
                .store
                .items_of_type(ItemType::MegaItem)?
                .into_iter()
                .filter(|item| match item {
                    Item::MegaItem(mega_item) => request
                        .mega_item_re_sync_needed_for
                        .contains(&mega_item.mega_item_type),
                    _ => false,
                });
            response.updated_items.add_all_deduped(mega_items);
        }
        Ok(())
    }

    fn add_settings(&self, request: &SyncRequest, response: &mut SyncResponse) {
        let mut settings = self.settings.to_synced();
        if request.current_default_grade_scale_index == Some(self.default_grade_scale_index) {
            settings.default_grade_scale = None;
        } else {
            response.default_grade_scale_index = Some(self.default_grade_scale_index);
        }
        response.settings = Some(settings);
    }
}

/// Adds `tombstone` to the response unless it is already there.
fn echo_tombstone(response: &mut SyncResponse, tombstone: DeletedItem) {
    if !response
        .deleted_items
        .iter()
        .any(|deleted| deleted.identifier == tombstone.identifier)
    {
        response.deleted_items.push(tombstone);
    }
}

/// Merges diffs that target the same identifier, later columns winning. A diff
/// that disagrees with an earlier one on the variant is returned as an error.
fn fold_updates(updates: &[ItemUpdate]) -> (Vec<ItemUpdate>, Vec<UpdateError>) {
    let mut folded: Vec<ItemUpdate> = Vec::with_capacity(updates.len());
    let mut positions: HashMap<Uuid, usize> = HashMap::new();
    let mut conflicts = Vec::new();

    for update in updates {
        let position = positions
            .get(&update.identifier)
            .copied()
            .filter(|_| !update.identifier.is_nil());
        match position.and_then(|index| folded.get_mut(index)) {
            Some(earlier) if earlier.item_type != update.item_type => {
                conflicts.push(UpdateError::new(
                    update.identifier,
                    UpdateErrorKind::InvalidField(format!(
                        "{} pushed as both {} and {}",
                        update.identifier, earlier.item_type, update.item_type
                    )),
                ));
            }
            Some(earlier) => earlier.fields.extend(update.fields.clone()),
            None => {
                positions.insert(update.identifier, folded.len());
                folded.push(update.clone());
            }
        }
    }
    (folded, conflicts)
}
