//! Statement extraction and category persistence backend
//!
//! The backend exposes three JSON endpoints:
//!
//! - `get-categories`: the persisted description to category memory
//! - `upload-pdf`: multipart statement upload returning the extracted transactions
//! - `save-category`: persist one description to category pair
//!
//! Every response carries a `status` discriminator. Anything other than `"success"` is a
//! failure, optionally explained by a `message` field.

use std::collections::BTreeMap;

use async_trait::async_trait;
use displaydoc::Display;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};
use thiserror::Error;

use crate::transaction::{RawTransaction, Transaction};

pub use http::HttpBackend;
pub use mock::MockBackend;

mod http;
mod mock;

/// Status value of a successful response
pub const SUCCESS: &str = "success";

/// Description to category mapping as stored by the backend
pub type CategoryMap = BTreeMap<String, String>;

#[derive(Error, Debug, Display, Clone, PartialEq, Eq)]
pub enum Error {
    /// could not reach the backend: {0}
    Transport(String),
    /// backend error: {0}
    Backend(String),
}

/// Statement file picked for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFile {
    /// File name sent with the multipart part
    pub name: String,
    /// Document bytes
    pub bytes: Vec<u8>,
}

impl StatementFile {
    pub fn new<S: Into<String>>(name: S, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Interface to the backend collaborator
///
/// Futures are not `Send`, the client runs on a single cooperative thread (wasm in the browser).
#[async_trait(?Send)]
pub trait Backend {
    /// Load the persisted category memory
    async fn get_categories(&self) -> Result<CategoryMap, Error>;

    /// Upload a statement and return the extracted transactions
    async fn upload_pdf(&self, file: &StatementFile) -> Result<Vec<Transaction>, Error>;

    /// Persist a category for a description
    async fn save_category(&self, description: &str, category: &str) -> Result<(), Error>;
}

/// Common shape of every backend response
pub trait Envelope: Sized {
    fn status(&self) -> &str;

    fn message(&self) -> Option<&str>;

    /// Turn a non success status into an error
    fn into_result(self) -> Result<Self, Error> {
        if self.status() == SUCCESS {
            return Ok(self);
        }
        let message = match self.message() {
            Some(message) if !message.trim().is_empty() => message.to_string(),
            _ => format!("unexpected status {:?}", self.status()),
        };
        Err(Error::Backend(message))
    }
}

/// Response of `get-categories`
#[serde_as]
#[derive(Debug, Deserialize, Serialize)]
pub struct CategoriesResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub memory: CategoryMap,
}

/// Response of `upload-pdf`
#[serde_as]
#[derive(Debug, Deserialize, Serialize)]
pub struct UploadResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default, alias = "raw_transactions")]
    pub transactions: Vec<RawTransaction>,
}

/// Body of `save-category`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SaveRequest {
    pub description: String,
    pub category: String,
}

/// Response of `save-category`
#[derive(Debug, Deserialize, Serialize)]
pub struct SaveResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

macro_rules! impl_envelope {
    ($($response:ty),*) => {
        $(
            impl Envelope for $response {
                fn status(&self) -> &str {
                    &self.status
                }

                fn message(&self) -> Option<&str> {
                    self.message.as_deref()
                }
            }
        )*
    };
}

impl_envelope!(CategoriesResponse, UploadResponse, SaveResponse);

impl UploadResponse {
    pub fn into_transactions(self) -> Vec<Transaction> {
        Transaction::from_raw(self.transactions)
    }
}
