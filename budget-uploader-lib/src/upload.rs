use displaydoc::Display;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    backend::{self, StatementFile},
    transaction::Transaction,
};


#[derive(Error, Debug, Display, Clone, PartialEq, Eq)]
pub enum Error {
    /// select a statement to upload first
    NoFileSelected,
    /// upload failed: {0}
    Backend(#[from] backend::Error),
}

/// One submitted upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTicket {
    /// Monotonic attempt id, only the latest attempt may update the store
    pub attempt: u64,
    /// File to send
    pub file: StatementFile,
}

/// What happened to an upload response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Latest attempt succeeded, the store must be replaced with these transactions
    Applied(Vec<Transaction>),
    /// Latest attempt failed, the store is left alone
    Failed(Error),
    /// A newer attempt was submitted since, the response is dropped
    Stale,
}

/// Owns the selected file and the loading and error state of uploads
#[derive(Debug, Clone, Default)]
pub struct UploadController {
    file: Option<StatementFile>,
    loading: bool,
    error: Option<String>,
    latest: u64,
}

impl UploadController {
    /// Replace the selected file
    pub fn select(&mut self, file: Option<StatementFile>) {
        self.file = file;
    }

    pub fn file(&self) -> Option<&StatementFile> {
        self.file.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message of the last failed upload
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Start an upload of the selected file
    ///
    /// Without a file nothing is sent and a validation message is set instead.
    pub fn begin(&mut self) -> Result<UploadTicket, Error> {
        let Some(file) = &self.file else {
            self.error = Some(Error::NoFileSelected.to_string());
            return Err(Error::NoFileSelected);
        };
        self.latest += 1;
        self.loading = true;
        self.error = None;
        info!(
            "Uploading {} ({} bytes) as attempt {}",
            file.name,
            file.bytes.len(),
            self.latest
        );
        Ok(UploadTicket {
            attempt: self.latest,
            file: file.clone(),
        })
    }

    /// Settle an upload attempt
    ///
    /// Loading is released whenever the latest attempt settles, whatever the result.
    pub fn finish(
        &mut self,
        attempt: u64,
        result: Result<Vec<Transaction>, backend::Error>,
    ) -> UploadOutcome {
        if attempt != self.latest {
            warn!(
                "Dropping response of upload attempt {}, attempt {} is newer",
                attempt, self.latest
            );
            return UploadOutcome::Stale;
        }
        self.loading = false;
        match result {
            Ok(transactions) => {
                info!("Upload attempt {} extracted {} transactions", attempt, transactions.len());
                self.error = None;
                UploadOutcome::Applied(transactions)
            }
            Err(e) => {
                let error = Error::from(e);
                warn!("Upload attempt {} failed: {}", attempt, error);
                self.error = Some(error.to_string());
                UploadOutcome::Failed(error)
            }
        }
    }
}
