//! Device-side sync progress.
//!
//! A device keeps one [`SyncState`] per account. It stamps outgoing requests with the
//! cursor and page token, and folds every response back in. The cursor only moves
//! once the final page of a sync has been received.

use serde::{Deserialize, Serialize};

use super::error::SyncError;
use super::protocol::{SyncRequest, SyncResponse};

/// What the device should do after accepting a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// More pages are waiting. Send another request right away.
    NextPage,
    /// The sync is complete and the cursor has advanced.
    Complete,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SyncState {
    pub change_cursor: u64,
    pub page_token: Option<String>,
    pub default_grade_scale_version: Option<i64>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a paged sync is in progress.
    pub fn is_paging(&self) -> bool {
        self.page_token.is_some()
    }

    /// Stamps `request` with the cursor, page token and grade scale version.
    pub fn prepare(&self, mut request: SyncRequest) -> SyncRequest {
        request.current_change_number = self.change_cursor;
        request.page = self.page_token.clone();
        request.current_default_grade_scale_index = self.default_grade_scale_version;
        request
    }

    /// Folds a response into the state.
    ///
    /// An account error leaves the state untouched and is returned as is.
    pub fn accept(&mut self, response: &SyncResponse) -> Result<Progress, SyncError> {
        if let Some(error) = response.error {
            return Err(error.into());
        }

        if let Some(version) = response.default_grade_scale_index {
            self.default_grade_scale_version = Some(version);
        }

        if !response.is_final_page() {
            self.page_token = response.next_page.clone();
            return Ok(Progress::NextPage);
        }

        self.page_token = None;
        if response.change_number < self.change_cursor {
            tracing::warn!(
                "Server change number {} is behind local cursor {}, keeping cursor",
                response.change_number,
                self.change_cursor
            );
        } else {
            self.change_cursor = response.change_number;
        }
        Ok(Progress::Complete)
    }
}
