//! File helpers for message exports and author directories.

use std::{fs, path::Path};

use crate::{
    error::Result,
    model::{AuthorDirectory, Message, parse_authors, parse_messages},
    store::JsonStore,
};

/// Load a message export from `path`.
///
/// # Errors
/// Returns an error if reading the file fails or it does not hold messages.
pub fn load_messages(path: &Path) -> Result<Vec<Message>> {
    let text = fs::read_to_string(path)?;
    parse_messages(&text)
}

/// Load an author directory from `path`.
///
/// # Errors
/// Returns an error if reading the file fails or it is not a list of records.
pub fn load_authors(path: &Path) -> Result<AuthorDirectory> {
    let text = fs::read_to_string(path)?;
    parse_authors(&text)
}

/// Load the verified member list kept in a store directory.
///
/// # Errors
/// Returns [`crate::Error::Store`] if the member list exists but cannot be read or
/// parsed. A missing list yields an empty directory.
pub fn load_store_authors(dir: &Path) -> Result<AuthorDirectory> {
    Ok(JsonStore::new(dir).authors()?)
}
