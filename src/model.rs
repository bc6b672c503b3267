//! Message records and the author directory.
//!
//! The shapes mirror the JSON the chat platform returns for channel messages,
//! reduced to the fields the converter reads. Optional fields default when
//! absent; `author.id` and `timestamp` are required so malformed records are
//! rejected while deserialising rather than halfway through formatting.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform message type codes the formatter distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum MessageKind {
    #[default]
    Default,
    ChannelPinnedMessage,
    UserJoin,
    ThreadCreated,
    Reply,
    ChatInputCommand,
    ThreadStarterMessage,
    Other(u8),
}

impl From<u8> for MessageKind {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Default,
            6 => Self::ChannelPinnedMessage,
            7 => Self::UserJoin,
            18 => Self::ThreadCreated,
            19 => Self::Reply,
            20 => Self::ChatInputCommand,
            21 => Self::ThreadStarterMessage,
            other => Self::Other(other),
        }
    }
}

impl From<MessageKind> for u8 {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Default => 0,
            MessageKind::ChannelPinnedMessage => 6,
            MessageKind::UserJoin => 7,
            MessageKind::ThreadCreated => 18,
            MessageKind::Reply => 19,
            MessageKind::ChatInputCommand => 20,
            MessageKind::ThreadStarterMessage => 21,
            MessageKind::Other(code) => code,
        }
    }
}

/// How a message points at another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ReferenceKind {
    #[default]
    Default,
    Forward,
}

impl From<u8> for ReferenceKind {
    fn from(code: u8) -> Self {
        if code == 1 { Self::Forward } else { Self::Default }
    }
}

impl From<ReferenceKind> for u8 {
    fn from(kind: ReferenceKind) -> Self {
        match kind {
            ReferenceKind::Default => 0,
            ReferenceKind::Forward => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageReference {
    #[serde(rename = "type", default)]
    pub kind: ReferenceKind,
}

/// Captured copy of a forwarded message. Snapshots carry no author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMessage {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub message: SnapshotMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub content: String,
    pub author: Author,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub referenced_message: Option<Box<Message>>,
    #[serde(default)]
    pub message_snapshots: Option<Vec<Snapshot>>,
    #[serde(default)]
    pub message_reference: Option<MessageReference>,
}

impl Message {
    /// Build a plain message; mostly useful for callers assembling records by hand.
    #[must_use]
    pub fn new(author: Author, timestamp: DateTime<Utc>, content: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            content: content.into(),
            author,
            timestamp,
            kind: MessageKind::Default,
            embeds: Vec::new(),
            attachments: Vec::new(),
            referenced_message: None,
            message_snapshots: None,
            message_reference: None,
        }
    }

    /// First forwarded snapshot, if the message carries one.
    #[must_use]
    pub fn snapshot(&self) -> Option<&SnapshotMessage> {
        self.message_snapshots
            .as_deref()
            .and_then(<[Snapshot]>::first)
            .map(|s| &s.message)
    }

    #[must_use]
    pub fn is_forward(&self) -> bool {
        self.message_reference
            .is_some_and(|r| r.kind == ReferenceKind::Forward)
    }

    /// Turn a snapshot into a message attributed to `author`.
    ///
    /// The snapshot's own timestamp wins; `fallback` covers snapshots that
    /// were captured without one.
    #[must_use]
    pub fn from_snapshot(
        snapshot: &SnapshotMessage,
        author: &Author,
        fallback: DateTime<Utc>,
    ) -> Self {
        let mut message = Self::new(
            author.clone(),
            snapshot.timestamp.unwrap_or(fallback),
            snapshot.content.clone(),
        );
        message.embeds.clone_from(&snapshot.embeds);
        message.attachments.clone_from(&snapshot.attachments);
        message
    }
}

/// One verified member: platform ID mapped to a wiki identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorRecord {
    pub member_id: String,
    pub wiki_account: String,
    pub display_name: String,
}

/// Read-only lookup from platform member ID to [`AuthorRecord`].
#[derive(Debug, Clone, Default)]
pub struct AuthorDirectory {
    records: Vec<AuthorRecord>,
    by_id: HashMap<String, usize>,
}

impl AuthorDirectory {
    /// Index `records`; on duplicate IDs the first record wins.
    #[must_use]
    pub fn new(records: Vec<AuthorRecord>) -> Self {
        let mut by_id = HashMap::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            by_id.entry(record.member_id.clone()).or_insert(idx);
        }
        Self { records, by_id }
    }

    #[must_use]
    pub fn get(&self, member_id: &str) -> Option<&AuthorRecord> {
        self.by_id.get(member_id).map(|&idx| &self.records[idx])
    }

    /// Wiki account for `author`, or the platform username when unverified.
    #[must_use]
    pub fn account_name<'a>(&'a self, author: &'a Author) -> &'a str {
        self.get(&author.id)
            .map_or(author.username.as_str(), |r| r.wiki_account.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<AuthorRecord>> for AuthorDirectory {
    fn from(records: Vec<AuthorRecord>) -> Self {
        Self::new(records)
    }
}

impl FromIterator<AuthorRecord> for AuthorDirectory {
    fn from_iter<I: IntoIterator<Item = AuthorRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Parse a message export: either a JSON array of messages or one message.
///
/// # Errors
/// Returns [`crate::Error::Json`] when the input is not a message or a list
/// of messages.
pub fn parse_messages(json: &str) -> crate::Result<Vec<Message>> {
    if json.trim_start().starts_with('[') {
        Ok(serde_json::from_str(json)?)
    } else {
        Ok(vec![serde_json::from_str(json)?])
    }
}

/// Parse a JSON array of [`AuthorRecord`]s into a directory.
///
/// # Errors
/// Returns [`crate::Error::Json`] on malformed input.
pub fn parse_authors(json: &str) -> crate::Result<AuthorDirectory> {
    let records: Vec<AuthorRecord> = serde_json::from_str(json)?;
    Ok(AuthorDirectory::new(records))
}
