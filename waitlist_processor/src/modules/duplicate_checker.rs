use async_trait::async_trait;
use std::sync::Arc;

use crate::modules::{
    error::WaitlistError,
    sinks::spreadsheet::SheetsClient,
};

// Answers whether an email is already on the waitlist.
// Implementations fail open: when unsure, the answer is "not a duplicate".
#[async_trait]
pub trait DuplicateLookup: Send + Sync {
    async fn is_duplicate(&self, email: &str) -> bool;
}

// For transports with no queryable store
pub struct NoDuplicateLookup;

#[async_trait]
impl DuplicateLookup for NoDuplicateLookup {
    async fn is_duplicate(&self, _email: &str) -> bool {
        false
    }
}

// Scans the first column of the waitlist sheet
pub struct SheetDuplicateLookup {
    sheets: Arc<SheetsClient>,
}

impl SheetDuplicateLookup {
    pub fn new(sheets: Arc<SheetsClient>) -> Self {
        Self { sheets }
    }

    async fn lookup(&self, email: &str) -> Result<bool, WaitlistError> {
        let rows = self.sheets.fetch_rows().await?;
        Ok(contains_email(&rows, email))
    }
}

#[async_trait]
impl DuplicateLookup for SheetDuplicateLookup {
    async fn is_duplicate(&self, email: &str) -> bool {
        match self.lookup(email).await {
            Ok(found) => found,
            Err(e) => {
                log::warn!("Duplicate check failed, allowing submission: {}", e);
                false
            }
        }
    }
}

// Case-insensitive match against column 1, rows without cells are skipped
pub fn contains_email(rows: &[Vec<String>], email: &str) -> bool {
    let email = email.to_lowercase();
    rows.iter()
        .filter_map(|row| row.first())
        .any(|existing| existing.to_lowercase() == email)
}
