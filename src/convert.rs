//! Message body conversion pipeline.
//!
//! A [`Converter`] is built once from [`Options`] and reused for every
//! message. Conversion runs the [`PIPELINE`] stages in order over the raw
//! chat text. Stages communicate only through the text and the per-call
//! [`ConversionContext`], so one converter can serve many threads at once.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    blocks::{self, apply_block_structure, contains_block_constructs, convert_headings},
    format::{MessageFlags, MetadataMode},
    inline::{self, Protected, render_emphasis},
    links::{DEFAULT_WIKI_BASE, LinkResolver},
    model::AuthorDirectory,
};

/// Settings shared by every conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Article path of the target wiki, e.g. `https://example.fandom.com/wiki/`.
    pub wiki_base: String,
    /// Render times as ` HH:MM` rather than the full RFC 1123 date.
    pub simple_date: bool,
    /// What to do with embeds and attachments.
    pub metadata: MetadataMode,
    /// Wrap multi-line bodies in `<poem>` so the wiki keeps line breaks.
    pub poem: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            wiki_base: DEFAULT_WIKI_BASE.to_string(),
            simple_date: true,
            metadata: MetadataMode::default(),
            poem: true,
        }
    }
}

/// One named pass of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    EscapeTemplates,
    EscapePipes,
    ResolveLinks,
    ExtractCode,
    Headings,
    Spoilers,
    InlineMarkup,
    VotingIcons,
    LineStructure,
    BareUrls,
}

/// Stage order. Later stages rely on the output of earlier ones: pipes are
/// escaped before links and mentions add their own, code is hidden before
/// any markup pass, and the line pass sees fully converted inline text.
pub const PIPELINE: [Stage; 10] = [
    Stage::EscapeTemplates,
    Stage::EscapePipes,
    Stage::ResolveLinks,
    Stage::ExtractCode,
    Stage::Headings,
    Stage::Spoilers,
    Stage::InlineMarkup,
    Stage::VotingIcons,
    Stage::LineStructure,
    Stage::BareUrls,
];

impl Stage {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EscapeTemplates => "escape-templates",
            Self::EscapePipes => "escape-pipes",
            Self::ResolveLinks => "resolve-links",
            Self::ExtractCode => "extract-code",
            Self::Headings => "headings",
            Self::Spoilers => "spoilers",
            Self::InlineMarkup => "inline-markup",
            Self::VotingIcons => "voting-icons",
            Self::LineStructure => "line-structure",
            Self::BareUrls => "bare-urls",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-call state threaded through the stages.
#[derive(Debug)]
pub struct ConversionContext<'a> {
    pub authors: &'a AuthorDirectory,
    pub flags: MessageFlags,
    protected: Protected,
}

impl<'a> ConversionContext<'a> {
    #[must_use]
    pub fn new(authors: &'a AuthorDirectory, flags: MessageFlags) -> Self {
        Self {
            authors,
            flags,
            protected: Protected::default(),
        }
    }

    pub fn protected_mut(&mut self) -> &mut Protected {
        &mut self.protected
    }

    /// Splice protected spans back into `text`.
    #[must_use]
    pub fn restore(&self, text: &str) -> String {
        self.protected.restore(text)
    }
}

/// Chat-markup to wikitext converter.
#[derive(Debug, Clone)]
pub struct Converter {
    options: Options,
    links: LinkResolver,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl Converter {
    #[must_use]
    pub fn new(options: Options) -> Self {
        let links = LinkResolver::new(&options.wiki_base);
        Self { options, links }
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Convert one message body to wikitext.
    ///
    /// Forwarded bodies are wrapped in a `''Forwarded:''` block quote. A body
    /// that opens with a list gets a leading newline so the wiki sees the
    /// first marker at the start of a line.
    ///
    /// # Examples
    ///
    /// ```
    /// use discordwiki::{Converter, model::AuthorDirectory};
    ///
    /// let converter = Converter::default();
    /// let out = converter.convert("**Bold**", &AuthorDirectory::default(), false);
    /// assert_eq!(out, "'''Bold'''");
    /// ```
    #[must_use]
    pub fn convert(&self, raw: &str, authors: &AuthorDirectory, forwarded: bool) -> String {
        let flags = MessageFlags {
            forwarded,
            ..MessageFlags::default()
        };
        let mut cx = ConversionContext::new(authors, flags);
        self.convert_with(raw, &mut cx)
    }

    /// Convert `raw` using an existing context.
    ///
    /// Placeholder delimiters in `raw` are dropped before any stage runs.
    #[must_use]
    pub fn convert_with(&self, raw: &str, cx: &mut ConversionContext<'_>) -> String {
        let mut text = Protected::sanitize(raw);
        for stage in PIPELINE {
            text = self.apply_stage(stage, &text, cx);
            trace!(%stage, len = text.len(), "applied stage");
        }
        let text = cx.restore(&text);
        if cx.flags.forwarded {
            format!("<blockquote>''Forwarded:''\n{text}</blockquote>")
        } else if blocks::starts_with_list(raw) {
            format!("\n{text}")
        } else {
            text
        }
    }

    /// Run a single stage over `text`.
    #[must_use]
    pub fn apply_stage(&self, stage: Stage, text: &str, cx: &mut ConversionContext<'_>) -> String {
        match stage {
            Stage::EscapeTemplates => inline::escape_templates(text, cx.protected_mut()),
            Stage::EscapePipes => inline::escape_pipes(text),
            Stage::ResolveLinks => self.links.resolve_links(text),
            Stage::ExtractCode => inline::extract_code(text, cx.protected_mut()),
            Stage::Headings => convert_headings(text),
            Stage::Spoilers => inline::convert_spoilers(text),
            Stage::InlineMarkup => inline::convert_inline_markup(text, cx.authors),
            Stage::VotingIcons => inline::convert_voting_icons(text),
            Stage::LineStructure => {
                if contains_block_constructs(text) {
                    apply_block_structure(text, render_emphasis)
                } else {
                    render_emphasis(text)
                }
            }
            Stage::BareUrls => self.links.resolve_bare_urls(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::model::AuthorRecord;

    #[fixture]
    fn authors() -> AuthorDirectory {
        AuthorDirectory::new(vec![AuthorRecord {
            member_id: "123".into(),
            wiki_account: "Ironwestie".into(),
            display_name: "Ironwestie".into(),
        }])
    }

    fn convert(text: &str, authors: &AuthorDirectory) -> String {
        Converter::default().convert(text, authors, false)
    }

    #[rstest]
    fn bold(authors: AuthorDirectory) {
        assert_eq!(convert("**Bold**", &authors), "'''Bold'''");
    }

    #[rstest]
    fn list_gets_leading_newline(authors: AuthorDirectory) {
        assert_eq!(
            convert("- Item 1\n- Item 2\n  - Subitem", &authors),
            "\n* Item 1\n* Item 2\n** Subitem"
        );
    }

    #[rstest]
    fn quote(authors: AuthorDirectory) {
        assert_eq!(convert("> Quote", &authors), "<blockquote>Quote</blockquote>");
    }

    #[rstest]
    fn forwarded_wrapper(authors: AuthorDirectory) {
        let out = Converter::default().convert("- a", &authors, true);
        assert_eq!(out, "<blockquote>''Forwarded:''\n* a</blockquote>");
    }

    #[rstest]
    fn emphasis_inside_lists_and_quotes(authors: AuthorDirectory) {
        assert_eq!(
            convert("text\n- **a**\n> *b*", &authors),
            "text\n\n* '''a'''\n<blockquote>''b''</blockquote>"
        );
    }

    #[rstest]
    fn code_is_left_alone(authors: AuthorDirectory) {
        assert_eq!(
            convert("`**x**` and ```\n- y\n```", &authors),
            "<code>**x**</code> and <pre>- y</pre>"
        );
    }

    #[rstest]
    fn heading_and_mention(authors: AuthorDirectory) {
        assert_eq!(
            convert("# Hi <@123>", &authors),
            "{{Fake heading|h2|Hi [[User:Ironwestie|Ironwestie]]}}"
        );
    }

    #[rstest]
    fn template_is_not_pipe_escaped(authors: AuthorDirectory) {
        assert_eq!(convert("{{Rip|a}} | b", &authors), "{{t|Rip|a}} {{!}} b");
    }

    #[rstest]
    fn links_and_bare_urls(authors: AuthorDirectory) {
        assert_eq!(
            convert(
                "**Bold text** with a [link](https://siivagunner.fandom.com/wiki/Katamari_Day)",
                &authors
            ),
            "'''Bold text''' with a [[Katamari Day|link]]"
        );
    }

    #[rstest]
    #[case(r"\*not italic\* and \_x\_", "*not italic* and _x_")]
    #[case(r"> \*\*kept\*\*", "<blockquote>**kept**</blockquote>")]
    #[case("see https://example.com/__init__.py", "see https://example.com/__init__.py")]
    #[case("https://example.com/**a** and **b**", "https://example.com/**a** and '''b'''")]
    fn escapes_and_urls_keep_markers(
        authors: AuthorDirectory,
        #[case] input: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(convert(input, &authors), expected);
    }

    #[rstest]
    fn raw_placeholder_marks_are_dropped(authors: AuthorDirectory) {
        assert_eq!(convert("a \u{0}0\u{0} b {{Foo}}", &authors), "a 0 b {{t|Foo}}");
    }

    #[test]
    fn custom_wiki_base() {
        let converter = Converter::new(Options {
            wiki_base: "https://example.org/wiki/".into(),
            ..Options::default()
        });
        let out = converter.convert(
            "https://example.org/wiki/Template:Foo",
            &AuthorDirectory::default(),
            false,
        );
        assert_eq!(out, "{{t|Foo}}");
    }

    #[test]
    fn stages_run_individually() {
        let converter = Converter::default();
        let authors = AuthorDirectory::default();
        let mut cx = ConversionContext::new(&authors, MessageFlags::default());
        assert_eq!(
            converter.apply_stage(Stage::VotingIcons, ":oppose:", &mut cx),
            "[[File:Voting-oppose.svg|20px|link=]]"
        );
        assert_eq!(converter.apply_stage(Stage::EscapePipes, "a|b", &mut cx), "a{{!}}b");
    }

    #[test]
    fn pipeline_order_is_fixed() {
        let names: Vec<_> = PIPELINE.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            [
                "escape-templates",
                "escape-pipes",
                "resolve-links",
                "extract-code",
                "headings",
                "spoilers",
                "inline-markup",
                "voting-icons",
                "line-structure",
                "bare-urls",
            ]
        );
    }

    #[test]
    fn options_deserialise_with_defaults() {
        let options: Options =
            serde_json::from_str(r#"{"simple_date": false}"#).expect("valid options");
        assert!(!options.simple_date);
        assert!(options.poem);
        assert_eq!(options.wiki_base, DEFAULT_WIKI_BASE);
    }
}
