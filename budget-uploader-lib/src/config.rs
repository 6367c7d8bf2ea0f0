use std::{
    collections::HashSet,
    fs::File,
    io::{BufReader, Cursor, Read},
    path::Path,
};

use displaydoc::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util;


/// Backend used when none is configured
pub const DEFAULT_BACKEND_URL: &str = "https://budget-pdf-backend.onrender.com";

/// Category taxonomy used when none is configured
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Bills",
    "Dining",
    "Entertainment",
    "Groceries",
    "Health",
    "Income",
    "Shopping",
    "Transfer",
    "Travel",
    "Other",
];

#[derive(Error, Debug, Display)]
pub enum Error {
    /// io: {0}
    Io(#[from] std::io::Error),
    /// serde_yaml: {0}
    SerdeYaml(#[from] serde_yaml::Error),
    /// duplicate categories: {0:?}
    DuplicateCategories(HashSet<String>),
    /// blank category label
    BlankCategory,
    /// no categories configured
    NoCategories,
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Base url of the extraction and persistence backend
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Closed set of category labels offered to the user
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.into()
}

fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|c| (*c).into()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            categories: default_categories(),
        }
    }
}

impl Config {
    /// Create a new config from a yaml file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::from_reader(File::open(path)?)
    }

    /// Create a new config from a yaml buffer
    pub fn from_yaml_buffer<B: AsRef<[u8]>>(buffer: B) -> Result<Self, Error> {
        Self::from_reader(Cursor::new(buffer))
    }

    /// Create a new config from a reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        let reader = BufReader::new(reader);
        let config = serde_yaml::from_reader::<_, Self>(reader)?;
        config.validate_categories()?;
        Ok(config)
    }

    /// Validate categories:
    /// * at least one category
    /// * no blank labels
    /// * no duplicate labels
    pub fn validate_categories(&self) -> Result<(), Error> {
        if self.categories.is_empty() {
            return Err(Error::NoCategories);
        }
        if self.categories.iter().any(|c| c.trim().is_empty()) {
            return Err(Error::BlankCategory);
        }
        let (_, duplicates) = util::vec_to_hashsets(self.categories.iter().map(String::as_str));
        if !duplicates.is_empty() {
            return Err(Error::DuplicateCategories(
                duplicates.into_iter().map(|c| c.into()).collect(),
            ));
        }
        Ok(())
    }

    /// Check if a label may be assigned, the empty label means uncategorized
    pub fn allows(&self, category: &str) -> bool {
        category.is_empty() || self.categories.iter().any(|c| c == category)
    }
}
