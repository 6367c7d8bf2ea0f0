use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
};

use async_trait::async_trait;

use super::{Backend, CategoryMap, Error, SaveRequest, StatementFile};
use crate::transaction::Transaction;

/// In memory backend
///
/// Persists saved categories like the real backend and replays scripted upload results in
/// order. Useful for tests and for running the front ends without a server.
#[derive(Debug, Default)]
pub struct MockBackend {
    persisted: RefCell<CategoryMap>,
    uploads: RefCell<VecDeque<Result<Vec<Transaction>, Error>>>,
    load_failure: RefCell<Option<Error>>,
    save_failure: RefCell<Option<Error>>,
    save_requests: RefCell<Vec<SaveRequest>>,
    upload_calls: Cell<usize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock with categories already persisted
    pub fn with_memory(memory: CategoryMap) -> Self {
        let backend = Self::default();
        *backend.persisted.borrow_mut() = memory;
        backend
    }

    /// Queue the result of the next `upload_pdf` call
    pub fn push_upload(&self, result: Result<Vec<Transaction>, Error>) {
        self.uploads.borrow_mut().push_back(result);
    }

    /// Make `get_categories` fail, or succeed again with `None`
    pub fn fail_loads(&self, error: Option<Error>) {
        *self.load_failure.borrow_mut() = error;
    }

    /// Make `save_category` fail, or succeed again with `None`
    pub fn fail_saves(&self, error: Option<Error>) {
        *self.save_failure.borrow_mut() = error;
    }

    /// Every save request received, failed ones included
    pub fn save_requests(&self) -> Vec<SaveRequest> {
        self.save_requests.borrow().clone()
    }

    /// Currently persisted categories
    pub fn persisted(&self) -> CategoryMap {
        self.persisted.borrow().clone()
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.get()
    }
}

#[async_trait(?Send)]
impl Backend for MockBackend {
    async fn get_categories(&self) -> Result<CategoryMap, Error> {
        if let Some(error) = self.load_failure.borrow().clone() {
            return Err(error);
        }
        Ok(self.persisted())
    }

    async fn upload_pdf(&self, _file: &StatementFile) -> Result<Vec<Transaction>, Error> {
        self.upload_calls.set(self.upload_calls.get() + 1);
        self.uploads
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Backend("no statement scripted".into())))
    }

    async fn save_category(&self, description: &str, category: &str) -> Result<(), Error> {
        self.save_requests.borrow_mut().push(SaveRequest {
            description: description.into(),
            category: category.into(),
        });
        if let Some(error) = self.save_failure.borrow().clone() {
            return Err(error);
        }
        self.persisted
            .borrow_mut()
            .insert(description.into(), category.into());
        Ok(())
    }
}
