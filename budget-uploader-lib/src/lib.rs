//! Client-side state for the budget uploader
//!
//! A [`session::Session`] owns the transaction store, the category memory, the active filter and
//! the pending category edits. Front ends drive it through [`backend::Backend`].

pub mod backend;
pub mod config;
pub mod filter;
pub mod memory;
pub mod presenter;
pub mod session;
pub mod transaction;
pub mod upload;
pub mod util;

#[cfg(test)]
mod tests;
