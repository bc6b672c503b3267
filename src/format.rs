//! `{{DiscordLog2}}` entries for single messages.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    convert::{ConversionContext, Converter},
    inline::escape_pipes,
    model::{AuthorDirectory, Message, MessageKind},
};

/// Wiki template every entry is written as.
pub const LOG_TEMPLATE: &str = "DiscordLog2";

/// Body shown for a "pinned a message" system message.
pub const PIN_TEXT: &str =
    "pinned '''a message''' to this channel. See all '''pinned messages'''";

/// Whether embed and attachment details appear in the entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataMode {
    #[default]
    Suppress,
    Append,
}

/// How one message is being presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageFlags {
    /// Shown as the quoted message above a reply.
    pub reply: bool,
    /// Body is a forwarded snapshot.
    pub forwarded: bool,
    pub simple_date: bool,
}

impl Default for MessageFlags {
    fn default() -> Self {
        Self {
            reply: false,
            forwarded: false,
            simple_date: true,
        }
    }
}

/// The `class` parameter of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryClass {
    Reply,
    SystemMessage,
    DateSeparator,
}

impl EntryClass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reply => "ping reply",
            Self::SystemMessage => "system-message",
            Self::DateSeparator => "date-separator",
        }
    }
}

/// Fields of one `{{DiscordLog2}}` call. Empty fields are left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogEntry {
    pub class: Option<EntryClass>,
    /// Primary timestamp, `t=`.
    pub time: Option<String>,
    /// Secondary timestamp, `t2=`.
    pub time_secondary: Option<String>,
    pub author: Option<String>,
    pub content: Option<String>,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{LOG_TEMPLATE}")?;
        if let Some(class) = self.class {
            write!(f, "|class={}", class.as_str())?;
        }
        if let Some(time) = &self.time {
            write!(f, "|t={time}")?;
        }
        if let Some(time) = &self.time_secondary {
            write!(f, "|t2={time}")?;
        }
        if let Some(author) = &self.author {
            write!(f, "|1={author}")?;
        }
        if let Some(content) = self.content.as_deref().filter(|c| !c.is_empty()) {
            write!(f, "|2={content}")?;
        }
        f.write_str("}}")
    }
}

/// ` HH:MM` in UTC, or the full `Fri, 21 Mar 2025 21:36:27 GMT` form.
#[must_use]
pub fn format_time(timestamp: &DateTime<Utc>, simple: bool) -> String {
    if simple {
        timestamp.format(" %H:%M").to_string()
    } else {
        timestamp.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
    }
}

/// `March 21, 2025`.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Entry that opens a new day in a batch.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use discordwiki::format::date_separator;
///
/// let date = NaiveDate::from_ymd_opt(2025, 3, 21).unwrap();
/// assert_eq!(
///     date_separator(date),
///     "{{DiscordLog2|class=date-separator|t=March 21, 2025}}"
/// );
/// ```
#[must_use]
pub fn date_separator(date: NaiveDate) -> String {
    LogEntry {
        class: Some(EntryClass::DateSeparator),
        time: Some(format_date(date)),
        ..LogEntry::default()
    }
    .to_string()
}

impl Converter {
    /// Format one message as a `{{DiscordLog2}}` entry.
    ///
    /// Reply context entries carry the `ping reply` class and move their
    /// time to `t2`. Pin notices become system messages. Unknown authors
    /// fall back to their chat username. This never fails; a message with
    /// nothing in it still yields a valid entry.
    #[must_use]
    pub fn format_message(
        &self,
        message: &Message,
        authors: &AuthorDirectory,
        flags: MessageFlags,
    ) -> String {
        self.log_entry(message, authors, flags).to_string()
    }

    /// Build the fields of the entry for `message`.
    #[must_use]
    pub fn log_entry(
        &self,
        message: &Message,
        authors: &AuthorDirectory,
        flags: MessageFlags,
    ) -> LogEntry {
        let time = format_time(&message.timestamp, flags.simple_date);
        let author = authors.account_name(&message.author).to_string();

        let (class, content) = match message.kind {
            MessageKind::ChannelPinnedMessage if message.content.is_empty() => {
                (Some(EntryClass::SystemMessage), PIN_TEXT.to_string())
            }
            MessageKind::ThreadCreated if !message.content.is_empty() => (
                Some(EntryClass::SystemMessage),
                format!("started a thread: '''{}'''", escape_pipes(&message.content)),
            ),
            _ => {
                let mut cx = ConversionContext::new(authors, flags);
                let body = self.convert_with(&message.content, &mut cx);
                let body = self.with_metadata(body, message);
                let class = flags.reply.then_some(EntryClass::Reply);
                (class, self.with_poem(body, flags))
            }
        };

        let (time, time_secondary) = if class.is_some() {
            (None, Some(time))
        } else {
            (Some(time), None)
        };
        LogEntry {
            class,
            time,
            time_secondary,
            author: Some(author),
            content: Some(content),
        }
    }

    fn with_metadata(&self, body: String, message: &Message) -> String {
        if self.options().metadata == MetadataMode::Suppress {
            return body;
        }
        let mut parts = Vec::new();
        if !body.is_empty() {
            parts.push(body);
        }
        for embed in &message.embeds {
            if let Some(title) = &embed.title {
                parts.push(format!("[Embed Title] {}", escape_pipes(title)));
            }
            if let Some(description) = &embed.description {
                parts.push(format!("[Embed Description] {}", escape_pipes(description)));
            }
            if let Some(url) = &embed.url {
                parts.push(format!("[Embed URL] {url}"));
            }
        }
        for attachment in &message.attachments {
            parts.push(format!("[Attachment] {}", attachment.url));
        }
        parts.join(" ")
    }

    fn with_poem(&self, body: String, flags: MessageFlags) -> String {
        if self.options().poem && !flags.forwarded && body.contains('\n') {
            format!("<poem>{body}</poem>")
        } else {
            body
        }
    }
}
