//! Convert chat messages into MediaWiki archive entries.
//!
//! Message bodies written in chat markup are rewritten as wikitext by a
//! [`Converter`], then wrapped in `{{DiscordLog2}}` template calls. Replies
//! are shown with the message they answer, forwards with their snapshot, and
//! batches are split by date.
//!
//! ```
//! use discordwiki::{Converter, model::{AuthorDirectory, parse_messages}};
//!
//! let messages = parse_messages(
//!     r#"{"author": {"id": "1", "username": "someone"},
//!         "timestamp": "2025-03-21T21:36:27Z", "content": "**hi**"}"#,
//! )
//! .unwrap();
//! let out = Converter::default().resolve_context(&messages[0], &AuthorDirectory::default());
//! assert_eq!(out.wikitext, "{{DiscordLog2|t= 21:36|1=someone|2='''hi'''}}");
//! ```

#[macro_use]
mod macros;

pub mod blocks;
pub mod context;
pub mod convert;
pub mod error;
pub mod format;
pub mod inline;
pub mod io;
pub mod links;
pub mod model;
pub mod store;

#[cfg(test)]
mod test_utils;

pub use context::{ContextWarning, Resolved};
pub use convert::{ConversionContext, Converter, Options, PIPELINE, Stage};
pub use error::{Error, Result};
pub use format::{MessageFlags, MetadataMode};
pub use model::{AuthorDirectory, AuthorRecord, Message};
pub use store::{JsonStore, StoreError};
