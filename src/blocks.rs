//! Line-oriented block structure: headings, lists and quotes.
//!
//! Headings are a plain per-line rewrite. Lists and quotes need carried state
//! (the indent baseline of the current list run, the lines of the open quote
//! block), so they go through [`BlockScanner`], a small state machine fed one
//! line at a time.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::lazy_regex;

static HEADING_RE: LazyLock<Regex> =
    lazy_regex!(r"(?m)^(#{1,6})[ \t]+(\S.*)$", "heading regex");

static LIST_ITEM_RE: LazyLock<Regex> = lazy_regex!(
    r"^([ \t]*)(?:[-*]|(\d+)\.)[ \t]+(\S.*)$",
    "list item regex"
);
static QUOTE_RE: LazyLock<Regex> = lazy_regex!(r"^>[ \t](.*)$", "quote regex");
static MULTI_QUOTE_RE: LazyLock<Regex> =
    lazy_regex!(r"^>>>[ \t](.*)$", "multi-line quote regex");

static CONTAINS_LIST_RE: LazyLock<Regex> = lazy_regex!(
    r"(?m)^[ \t]*(?:[-*]|\d+\.)[ \t]+\S",
    "list detection regex"
);
static CONTAINS_QUOTE_RE: LazyLock<Regex> =
    lazy_regex!(r"(?m)^(?:>|>>>)[ \t]", "quote detection regex");
static STARTS_WITH_LIST_RE: LazyLock<Regex> =
    lazy_regex!(r"^(?:[-*]|\d+\.)\s+", "leading list regex");

/// Columns per nesting level in chat lists.
pub const INDENT_UNIT: usize = 2;

/// Deepest ordered level the wiki output keeps (`#` and `##`).
pub const MAX_ORDERED_DEPTH: usize = 2;

/// Headings with more hashes than this stay literal.
pub const MAX_HEADING_HASHES: usize = 3;

/// Rewrite `#`, `##` and `###` headings as `{{Fake heading}}` calls one level
/// down, since level one is the page title.
///
/// Four or more hashes are not headings in chat and are left alone.
///
/// # Examples
///
/// ```
/// use discordwiki::blocks::convert_headings;
///
/// assert_eq!(convert_headings("# Title"), "{{Fake heading|h2|Title}}");
/// assert_eq!(convert_headings("#### Four"), "#### Four");
/// ```
#[must_use]
pub fn convert_headings(text: &str) -> String {
    HEADING_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let hashes = caps[1].len();
            if hashes > MAX_HEADING_HASHES {
                return caps[0].to_string();
            }
            let level = (hashes + 1).min(6);
            format!("{{{{Fake heading|h{level}|{}}}}}", caps[2].trim_end())
        })
        .into_owned()
}

/// Whether `text` has a line the [`BlockScanner`] would restructure.
#[must_use]
pub fn contains_block_constructs(text: &str) -> bool {
    CONTAINS_LIST_RE.is_match(text) || CONTAINS_QUOTE_RE.is_match(text)
}

/// Whether the first line of `text` is an unindented list item.
#[must_use]
pub fn starts_with_list(text: &str) -> bool {
    STARTS_WITH_LIST_RE.is_match(text)
}

/// One parsed list line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem<'a> {
    /// Nesting level from indentation alone.
    pub level: usize,
    pub ordered: bool,
    pub text: &'a str,
}

/// Parse `line` as a list item.
#[must_use]
pub fn parse_list_item(line: &str) -> Option<ListItem<'_>> {
    let caps = LIST_ITEM_RE.captures(line)?;
    let indent = caps.get(1).map_or("", |m| m.as_str());
    Some(ListItem {
        level: indent_len(indent) / INDENT_UNIT,
        ordered: caps.get(2).is_some(),
        text: caps.get(3)?.as_str(),
    })
}

fn indent_len(indent: &str) -> usize {
    indent
        .chars()
        .fold(0, |acc, ch| acc + if ch == '\t' { 4 } else { 1 })
}

/// Wiki marker for an item `depth` levels below its run's baseline.
fn list_marker(ordered: bool, depth: usize) -> String {
    if ordered {
        "#".repeat(depth.min(MAX_ORDERED_DEPTH - 1) + 1)
    } else {
        "*".repeat(depth + 1)
    }
}

#[derive(Debug, Default)]
enum ScanState {
    #[default]
    Normal,
    InList {
        baseline: usize,
    },
    InQuote {
        lines: Vec<String>,
        /// `>>>` quotes run to the end of the message.
        to_end: bool,
    },
}

/// State machine that turns chat lists and quotes into wiki block markup.
///
/// `render` is applied to prose lines, list item text and quoted lines.
pub struct BlockScanner<F> {
    state: ScanState,
    out: Vec<String>,
    render: F,
}

impl<F: Fn(&str) -> String> BlockScanner<F> {
    pub fn new(render: F) -> Self {
        Self {
            state: ScanState::Normal,
            out: Vec::new(),
            render,
        }
    }

    pub fn push_line(&mut self, line: &str) {
        if let ScanState::InQuote { lines, to_end: true } = &mut self.state {
            lines.push(line.to_string());
            return;
        }
        if let Some(caps) = MULTI_QUOTE_RE.captures(line) {
            self.close_quote();
            self.state = ScanState::InQuote {
                lines: vec![caps[1].to_string()],
                to_end: true,
            };
            return;
        }
        if let Some(caps) = QUOTE_RE.captures(line) {
            if let ScanState::InQuote { lines, .. } = &mut self.state {
                lines.push(caps[1].to_string());
            } else {
                self.state = ScanState::InQuote {
                    lines: vec![caps[1].to_string()],
                    to_end: false,
                };
            }
            return;
        }
        self.close_quote();

        if let Some(item) = parse_list_item(line) {
            let baseline = match self.state {
                ScanState::InList { baseline } => baseline,
                _ => {
                    if !self.out.is_empty() {
                        self.out.push(String::new());
                    }
                    self.state = ScanState::InList {
                        baseline: item.level,
                    };
                    item.level
                }
            };
            let rendered = self.render_item(&item, baseline);
            self.out.push(rendered);
            return;
        }

        if line.trim().is_empty() {
            // Blank lines do not end a list run.
            self.out.push(String::new());
            return;
        }
        self.state = ScanState::Normal;
        let rendered = (self.render)(line);
        self.out.push(rendered);
    }

    /// Close any open block and return the structured text.
    pub fn finish(mut self) -> String {
        self.close_quote();
        self.out.join("\n")
    }

    fn render_item(&self, item: &ListItem<'_>, baseline: usize) -> String {
        let depth = item.level.saturating_sub(baseline);
        format!(
            "{} {}",
            list_marker(item.ordered, depth),
            (self.render)(item.text)
        )
    }

    fn close_quote(&mut self) {
        if !matches!(self.state, ScanState::InQuote { .. }) {
            return;
        }
        let ScanState::InQuote { lines, .. } = std::mem::take(&mut self.state) else {
            return;
        };
        let mut baseline = None;
        let body: Vec<String> = lines
            .iter()
            .map(|line| match parse_list_item(line) {
                Some(item) => {
                    let base = *baseline.get_or_insert(item.level);
                    self.render_item(&item, base)
                }
                None => (self.render)(line.as_str()),
            })
            .collect();
        self.out
            .push(format!("<blockquote>{}</blockquote>", body.join("\n")));
    }
}

/// Run the list and quote scanner over every line of `text`.
///
/// # Examples
///
/// ```
/// use discordwiki::blocks::apply_block_structure;
///
/// let out = apply_block_structure("- Item 1\n- Item 2\n  - Subitem", str::to_string);
/// assert_eq!(out, "* Item 1\n* Item 2\n** Subitem");
/// ```
#[must_use]
pub fn apply_block_structure<F: Fn(&str) -> String>(text: &str, render: F) -> String {
    let mut scanner = BlockScanner::new(render);
    for line in text.split('\n') {
        scanner.push_line(line);
    }
    scanner.finish()
}
