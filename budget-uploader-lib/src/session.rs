//! Single owner of the client state
//!
//! Every mutation recomputes the [`CategorizedView`] synchronously and then notifies the
//! subscribers with the kind of [`Change`]. Network work is split into `begin_*` and `finish_*`
//! steps, neither of which spans an await. The `async` methods compose both steps for callers
//! that can hold the session while the request runs.

use displaydoc::Display;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    backend::{self, Backend, CategoryMap},
    config::Config,
    filter::FilterState,
    memory::CategoryMemory,
    presenter::{self, CategorizedView, PendingEdits},
    transaction::Transaction,
    upload::{self, UploadController, UploadOutcome, UploadTicket},
};

#[derive(Error, Debug, Display, Clone, PartialEq, Eq)]
pub enum Error {
    /// unknown category {0:?}
    UnknownCategory(String),
    /// saving category failed: {0}
    Save(#[from] backend::Error),
}

/// Kind of state change a subscriber is told about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Category memory loaded or a save confirmed
    Memory,
    /// Transaction store replaced
    Transactions,
    /// Filter changed
    Filter,
    /// Category selected by the user
    Edit,
    /// Selected file, loading or error state changed
    Upload,
    /// A category save failed
    SaveFailed,
}

/// Category save in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    pub description: String,
    pub category: String,
    /// Issue order of the save, later saves of a description win
    pub sequence: u64,
}

type Subscriber = Box<dyn FnMut(Change, &CategorizedView)>;

/// Client session
pub struct Session {
    config: Config,
    memory: CategoryMemory,
    memory_loaded: bool,
    transactions: Vec<Transaction>,
    filter: FilterState,
    upload: UploadController,
    pending: PendingEdits,
    view: CategorizedView,
    save_sequence: u64,
    save_error: Option<String>,
    subscribers: Vec<Subscriber>,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            memory: CategoryMemory::default(),
            memory_loaded: false,
            transactions: Vec::new(),
            filter: FilterState::default(),
            upload: UploadController::default(),
            pending: PendingEdits::default(),
            view: CategorizedView::default(),
            save_sequence: 0,
            save_error: None,
            subscribers: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn memory(&self) -> &CategoryMemory {
        &self.memory
    }

    /// True once the initial memory load settled, successfully or not
    pub fn memory_loaded(&self) -> bool {
        self.memory_loaded
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn filter(&self) -> FilterState {
        self.filter
    }

    pub fn upload(&self) -> &UploadController {
        &self.upload
    }

    pub fn view(&self) -> &CategorizedView {
        &self.view
    }

    pub fn pending(&self) -> &PendingEdits {
        &self.pending
    }

    /// Message of the last failed save, cleared by the next successful one
    pub fn save_error(&self) -> Option<&str> {
        self.save_error.as_deref()
    }

    /// Register a callback run after every change
    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(Change, &CategorizedView) + 'static,
    {
        self.subscribers.push(Box::new(subscriber));
    }

    fn notify(&mut self, change: Change) {
        debug!("Session change {:?}", change);
        for subscriber in self.subscribers.iter_mut() {
            subscriber(change, &self.view);
        }
    }

    fn recompute(&mut self) {
        self.view = presenter::present(
            &self.transactions,
            &self.filter,
            &self.memory,
            &self.pending,
        );
    }

    /// Apply the result of the initial memory load
    ///
    /// A failure leaves the memory empty, the session keeps working.
    pub fn finish_memory_load(&mut self, result: Result<CategoryMap, backend::Error>) {
        match result {
            Ok(snapshot) => self.memory.merge(snapshot),
            Err(e) => warn!("Starting with an empty category memory: {}", e),
        }
        self.memory_loaded = true;
        self.recompute();
        self.notify(Change::Memory);
    }

    /// Load the category memory from the backend
    pub async fn load_memory<B: Backend + ?Sized>(&mut self, backend: &B) {
        let result = backend.get_categories().await;
        self.finish_memory_load(result);
    }

    /// Pick the statement to upload, `None` clears the selection
    pub fn select_file(&mut self, file: Option<backend::StatementFile>) {
        self.upload.select(file);
        self.notify(Change::Upload);
    }

    /// Start an upload of the selected file
    pub fn begin_upload(&mut self) -> Result<UploadTicket, upload::Error> {
        let ticket = self.upload.begin();
        self.notify(Change::Upload);
        ticket
    }

    /// Settle an upload attempt, replacing the store when it is the latest and succeeded
    pub fn finish_upload(
        &mut self,
        attempt: u64,
        result: Result<Vec<Transaction>, backend::Error>,
    ) -> UploadOutcome {
        let outcome = self.upload.finish(attempt, result);
        match &outcome {
            UploadOutcome::Applied(transactions) => {
                self.transactions = transactions.clone();
                self.recompute();
                self.notify(Change::Transactions);
            }
            UploadOutcome::Failed(_) => self.notify(Change::Upload),
            UploadOutcome::Stale => {}
        }
        outcome
    }

    /// Upload the selected file and apply the extraction
    pub async fn upload_statement<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> Result<UploadOutcome, upload::Error> {
        let ticket = self.begin_upload()?;
        let result = backend.upload_pdf(&ticket.file).await;
        match self.finish_upload(ticket.attempt, result) {
            UploadOutcome::Failed(e) => Err(e),
            outcome => Ok(outcome),
        }
    }

    /// Change the visible period
    pub fn set_filter(&mut self, filter: FilterState) {
        if filter == self.filter {
            return;
        }
        self.filter = filter;
        self.recompute();
        self.notify(Change::Filter);
    }

    /// Show a new category for a description right away and issue its save
    ///
    /// The edit stays pending, and wins over memory, until its own save or a newer one for the
    /// same description is confirmed.
    pub fn begin_category_change(
        &mut self,
        description: &str,
        category: &str,
    ) -> Result<SaveTicket, Error> {
        if !self.config.allows(category) {
            return Err(Error::UnknownCategory(category.into()));
        }
        self.save_sequence += 1;
        self.pending.insert(description, category, self.save_sequence);
        self.view.select(description, category);
        self.notify(Change::Edit);
        Ok(SaveTicket {
            description: description.into(),
            category: category.into(),
            sequence: self.save_sequence,
        })
    }

    /// Settle a save
    ///
    /// On failure the optimistic edit stays visible and the error is surfaced. Nothing is
    /// retried.
    pub fn finish_save(
        &mut self,
        ticket: &SaveTicket,
        result: Result<(), backend::Error>,
    ) -> Result<(), Error> {
        match result {
            Ok(()) => {
                if !self
                    .memory
                    .commit(&ticket.description, &ticket.category, ticket.sequence)
                {
                    debug!(
                        "Ignoring confirmation of save {} for {:?}, a newer save was confirmed",
                        ticket.sequence, ticket.description
                    );
                }
                self.save_error = None;
                self.pending.resolve(&self.memory);
                self.recompute();
                self.notify(Change::Memory);
                Ok(())
            }
            Err(e) => {
                warn!(
                    "Saving {:?} as {:?} failed: {}",
                    ticket.description, ticket.category, e
                );
                let error = Error::from(e);
                self.save_error = Some(error.to_string());
                self.notify(Change::SaveFailed);
                Err(error)
            }
        }
    }

    /// Select a category for a description and persist it
    pub async fn change_category<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
        description: &str,
        category: &str,
    ) -> Result<(), Error> {
        let ticket = self.begin_category_change(description, category)?;
        let result = backend
            .save_category(&ticket.description, &ticket.category)
            .await;
        self.finish_save(&ticket, result)
    }
}
