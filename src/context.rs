//! Reply and forward context around a message, and batches of messages.

use std::fmt;

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::{
    convert::Converter,
    format::{MessageFlags, date_separator},
    model::{AuthorDirectory, Message, MessageKind},
};

/// Separator between entries.
pub const ENTRY_SEPARATOR: &str = "\n\n";

/// Something that could not be shown but did not stop formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextWarning {
    /// A reply arrived without the message it replies to.
    MissingReference { message_id: String },
}

impl fmt::Display for ContextWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingReference { message_id } => {
                write!(f, "reply {message_id} has no referenced message")
            }
        }
    }
}

/// Wikitext for one or more messages plus any warnings raised on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    pub wikitext: String,
    pub warnings: Vec<ContextWarning>,
}

impl Converter {
    /// Format `message` with whatever context it needs.
    ///
    /// A reply is preceded by the message it answers, formatted as a reply
    /// context entry. A forward is shown as its snapshot, attributed to the
    /// forwarding author. Never emits date separators.
    #[must_use]
    pub fn resolve_context(&self, message: &Message, authors: &AuthorDirectory) -> Resolved {
        let base = MessageFlags {
            simple_date: self.options().simple_date,
            ..MessageFlags::default()
        };
        let mut entries = Vec::with_capacity(2);
        let mut warnings = Vec::new();

        if message.kind == MessageKind::Reply {
            match message.referenced_message.as_deref() {
                Some(referenced) => {
                    let flags = MessageFlags {
                        reply: true,
                        ..base
                    };
                    entries.push(self.format_source(referenced, authors, flags));
                }
                None => {
                    warn!(message_id = %message.id, "reply without referenced message");
                    warnings.push(ContextWarning::MissingReference {
                        message_id: message.id.clone(),
                    });
                }
            }
            entries.push(self.format_message(message, authors, base));
        } else if message.is_forward()
            && let Some(snapshot) = message.snapshot()
        {
            let forwarded = Message::from_snapshot(snapshot, &message.author, message.timestamp);
            let flags = MessageFlags {
                forwarded: true,
                ..base
            };
            entries.push(self.format_message(&forwarded, authors, flags));
        } else {
            entries.push(self.format_message(message, authors, base));
        }

        Resolved {
            wikitext: entries.join(ENTRY_SEPARATOR),
            warnings,
        }
    }

    /// Format a batch in input order, opening each new UTC date with a
    /// separator entry.
    ///
    /// Messages are formatted in parallel and assembled afterwards.
    #[must_use]
    pub fn resolve_context_batch(
        &self,
        messages: &[Message],
        authors: &AuthorDirectory,
    ) -> Resolved {
        let formatted: Vec<(NaiveDate, Resolved)> = messages
            .par_iter()
            .map(|m| (m.timestamp.date_naive(), self.resolve_context(m, authors)))
            .collect();

        let mut entries = Vec::with_capacity(formatted.len() * 2);
        let mut warnings = Vec::new();
        let mut current: Option<NaiveDate> = None;
        for (date, resolved) in formatted {
            if current != Some(date) {
                debug!(%date, "date separator");
                entries.push(date_separator(date));
                current = Some(date);
            }
            entries.push(resolved.wikitext);
            warnings.extend(resolved.warnings);
        }
        Resolved {
            wikitext: entries.join(ENTRY_SEPARATOR),
            warnings,
        }
    }

    /// The quoted side of a reply; a forwarded original shows its snapshot.
    fn format_source(
        &self,
        referenced: &Message,
        authors: &AuthorDirectory,
        flags: MessageFlags,
    ) -> String {
        match referenced.snapshot() {
            Some(snapshot) => {
                let forwarded =
                    Message::from_snapshot(snapshot, &referenced.author, referenced.timestamp);
                let flags = MessageFlags {
                    forwarded: true,
                    ..flags
                };
                self.format_message(&forwarded, authors, flags)
            }
            None => self.format_message(referenced, authors, flags),
        }
    }
}
