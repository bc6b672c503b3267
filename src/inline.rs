//! Inline chat markup to wikitext.
//!
//! Each transform is a standalone function over the whole message body. The
//! order they run in matters because the markers overlap: underline has to be
//! resolved before emphasis so `__**x**__` nests correctly, and triple
//! asterisks must be consumed before double and single ones.
//!
//! Unbalanced markers are never an error. A pattern either matches a
//! well-formed span or the text is left as it was.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::{lazy_regex, model::AuthorDirectory};

static PLACEHOLDER_RE: LazyLock<Regex> =
    lazy_regex!("\u{0}([0-9]+)\u{0}", "placeholder regex");

static TEMPLATE_RE: LazyLock<Regex> =
    lazy_regex!(r"\{\{([^{}|]+)(\|[^{}]+)?\}\}", "template regex");
static PIPE_RUN_RE: LazyLock<Regex> = lazy_regex!(r"\|+", "pipe run regex");

static FENCED_CODE_RE: LazyLock<Regex> =
    lazy_regex!(r"(?s)```(.*?)```", "fenced code regex");
static LANG_LINE_RE: LazyLock<Regex> =
    lazy_regex!(r"^[A-Za-z0-9_+.#-]+\n", "code language regex");
// The leftmost match wins, so an escaped backtick never opens a code span.
static CODE_OR_ESCAPE_RE: LazyLock<Regex> =
    lazy_regex!(r"`([^`]+)`|\\([*_~`])", "inline code or escape regex");

static SPOILER_RE: LazyLock<Regex> = lazy_regex!(r"(?s)\|\|(.+?)\|\|", "spoiler regex");
static SUBTEXT_RE: LazyLock<Regex> = lazy_regex!(r"(?m)^-#\s+(.+)$", "subtext regex");

static UNDERLINE_BOLD_ITALIC_RE: LazyLock<Regex> =
    lazy_regex!(r"__\*\*\*(.+?)\*\*\*__", "underline bold italic regex");
static UNDERLINE_BOLD_RE: LazyLock<Regex> =
    lazy_regex!(r"__\*\*(.+?)\*\*__", "underline bold regex");
static UNDERLINE_ITALIC_RE: LazyLock<Regex> =
    lazy_regex!(r"__\*(.+?)\*__", "underline italic regex");
static UNDERLINE_RE: LazyLock<Regex> = lazy_regex!(r"__(.+?)__", "underline regex");

static USER_MENTION_RE: LazyLock<Regex> = lazy_regex!(r"<@!?(\d+)>", "user mention regex");
static CHANNEL_MENTION_RE: LazyLock<Regex> =
    lazy_regex!(r"<#(\d+)>", "channel mention regex");
static ROLE_MENTION_RE: LazyLock<Regex> = lazy_regex!(r"<@&(\d+)>", "role mention regex");
static CUSTOM_EMOJI_RE: LazyLock<Regex> =
    lazy_regex!(r"<a?:(\w+):\d+>", "custom emoji regex");
static TRIPLE_EQUALS_RE: LazyLock<Regex> = lazy_regex!("===", "triple equals regex");
static SHORTCODE_RE: LazyLock<Regex> = lazy_regex!(r":([a-z]+):", "shortcode regex");

static BOLD_ITALIC_RE: LazyLock<Regex> = lazy_regex!(
    r"\*\*\*([^\s*](?:[^\n]*?[^\s*])?)\*\*\*",
    "bold italic regex"
);
static BOLD_RE: LazyLock<Regex> =
    lazy_regex!(r"\*\*([^\s*](?:[^\n]*?[^\s*])?)\*\*", "bold regex");
static ITALIC_STAR_RE: LazyLock<Regex> =
    lazy_regex!(r"\*([^\s*](?:[^*\n]*?[^\s*])?)\*", "italic regex");
static ITALIC_UNDERSCORE_RE: LazyLock<Regex> =
    lazy_regex!(r"_([^\s_](?:[^_\n]*?[^\s_])?)_", "underscore italic regex");
static STRIKE_RE: LazyLock<Regex> =
    lazy_regex!(r"~~([^\s~](?:[^\n]*?[^\s~])?)~~", "strikethrough regex");

/// Voting shortcodes and the icon each one embeds.
pub const VOTING_ICONS: [(&str, &str); 4] = [
    ("support", "Voting-support.svg"),
    ("neutral", "Voting-neutral.svg"),
    ("oppose", "Voting-oppose.svg"),
    ("restructure", "Voting-restructure.svg"),
];

/// Finished wikitext hidden from later passes.
///
/// Stashed spans are replaced by an opaque placeholder and spliced back in by
/// [`Protected::restore`]. A span may itself contain placeholders.
#[derive(Debug, Default, Clone)]
pub struct Protected {
    spans: Vec<String>,
}

impl Protected {
    /// Stash `wikitext` and return the placeholder that stands in for it.
    pub fn stash(&mut self, wikitext: String) -> String {
        let idx = self.spans.len();
        self.spans.push(wikitext);
        format!("\u{0}{idx}\u{0}")
    }

    /// Drop placeholder delimiters from raw input, so only stashed spans can
    /// produce a placeholder.
    #[must_use]
    pub fn sanitize(text: &str) -> String {
        text.replace('\u{0}', "")
    }

    /// Replace every placeholder in `text` with its span.
    #[must_use]
    pub fn restore(&self, text: &str) -> String {
        let mut out = text.to_string();
        // Each round peels one level of nesting.
        for _ in 0..=self.spans.len() {
            if !PLACEHOLDER_RE.is_match(&out) {
                break;
            }
            out = PLACEHOLDER_RE
                .replace_all(&out, |caps: &Captures<'_>| {
                    caps[1]
                        .parse::<usize>()
                        .ok()
                        .and_then(|idx| self.spans.get(idx))
                        .cloned()
                        .unwrap_or_default()
                })
                .into_owned();
        }
        out
    }
}

/// Show `{{Name|args}}` as a template call instead of transcluding it.
///
/// # Examples
///
/// ```
/// use discordwiki::inline::{Protected, escape_templates};
///
/// let mut protected = Protected::default();
/// let out = escape_templates("use {{Rip|game}}", &mut protected);
/// assert_eq!(protected.restore(&out), "use {{t|Rip|game}}");
/// ```
pub fn escape_templates(text: &str, protected: &mut Protected) -> String {
    TEMPLATE_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let name = caps[1].trim();
            let rendered = if name.eq_ignore_ascii_case("t") {
                caps[0].to_string()
            } else {
                let params = caps.get(2).map_or("", |m| m.as_str());
                format!("{{{{t|{name}{params}}}}}")
            };
            protected.stash(rendered)
        })
        .into_owned()
}

/// Escape lone pipes so they cannot split template parameters.
///
/// Runs of two or more pipes are kept; they are spoiler markers.
#[must_use]
pub fn escape_pipes(text: &str) -> String {
    PIPE_RUN_RE
        .replace_all(text, |caps: &Captures<'_>| {
            if caps[0].len() == 1 {
                "{{!}}".to_string()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

/// Turn fenced blocks into `<pre>` and inline code into `<code>`.
///
/// Both are stashed so no later pass rewrites their contents. `<pre>`
/// contents are not parsed by the wiki, so escaped pipes are put back.
/// Outside code, a backslash before `*`, `_`, `~` or a backtick keeps that
/// character literal.
///
/// # Examples
///
/// ```
/// use discordwiki::inline::{Protected, extract_code, render_emphasis};
///
/// let mut protected = Protected::default();
/// let out = extract_code(r"\*not italic\* `a\*b`", &mut protected);
/// let out = protected.restore(&render_emphasis(&out));
/// assert_eq!(out, r"*not italic* <code>a\*b</code>");
/// ```
pub fn extract_code(text: &str, protected: &mut Protected) -> String {
    let text = FENCED_CODE_RE.replace_all(text, |caps: &Captures<'_>| {
        let mut code = &caps[1];
        if let Some(lang) = LANG_LINE_RE.find(code) {
            code = &code[lang.end()..];
        }
        let code = code.strip_prefix('\n').unwrap_or(code);
        let code = code.strip_suffix('\n').unwrap_or(code);
        protected.stash(format!("<pre>{}</pre>", code.replace("{{!}}", "|")))
    });
    CODE_OR_ESCAPE_RE
        .replace_all(&text, |caps: &Captures<'_>| match caps.get(1) {
            Some(code) => protected.stash(format!("<code>{}</code>", code.as_str())),
            None => protected.stash(caps[2].to_string()),
        })
        .into_owned()
}

#[must_use]
pub fn convert_spoilers(text: &str) -> String {
    SPOILER_RE
        .replace_all(text, r#"<div class="spoiler">$1</div>"#)
        .into_owned()
}

#[must_use]
pub fn convert_subtext(text: &str) -> String {
    SUBTEXT_RE.replace_all(text, "<small>$1</small>").into_owned()
}

/// Underline is the outer wrapper; emphasis inside it is resolved here too.
#[must_use]
pub fn convert_underline(text: &str) -> String {
    let text = replace_outside_urls(&UNDERLINE_BOLD_ITALIC_RE, text, "<u>'''''$1'''''</u>");
    let text = replace_outside_urls(&UNDERLINE_BOLD_RE, &text, "<u>'''$1'''</u>");
    let text = replace_outside_urls(&UNDERLINE_ITALIC_RE, &text, "<u>''$1''</u>");
    replace_outside_urls(&UNDERLINE_RE, &text, "<u>$1</u>")
}

/// Resolve user, channel and role mentions.
///
/// Users found in `authors` become wiki user links; unknown users keep the
/// raw token. Channels and roles cannot be resolved here and are reduced to
/// `#id` and `@id`.
#[must_use]
pub fn convert_mentions(text: &str, authors: &AuthorDirectory) -> String {
    let text = USER_MENTION_RE.replace_all(text, |caps: &Captures<'_>| {
        authors.get(&caps[1]).map_or_else(
            || caps[0].to_string(),
            |member| format!("[[User:{}|{}]]", member.wiki_account, member.display_name),
        )
    });
    let text = CHANNEL_MENTION_RE.replace_all(&text, "#$1");
    ROLE_MENTION_RE.replace_all(&text, "@$1").into_owned()
}

#[must_use]
pub fn convert_custom_emoji(text: &str) -> String {
    CUSTOM_EMOJI_RE.replace_all(text, ":$1:").into_owned()
}

#[must_use]
pub fn escape_triple_equals(text: &str) -> String {
    TRIPLE_EQUALS_RE
        .replace_all(text, "<nowiki>===</nowiki>")
        .into_owned()
}

/// Subtext, underline, mentions, custom emoji and `===`, in that order.
#[must_use]
pub fn convert_inline_markup(text: &str, authors: &AuthorDirectory) -> String {
    let text = convert_subtext(text);
    let text = convert_underline(&text);
    let text = convert_mentions(&text, authors);
    let text = convert_custom_emoji(&text);
    escape_triple_equals(&text)
}

/// Replace voting shortcodes with their icons; other shortcodes pass through.
#[must_use]
pub fn convert_voting_icons(text: &str) -> String {
    SHORTCODE_RE
        .replace_all(text, |caps: &Captures<'_>| {
            VOTING_ICONS
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map_or_else(
                    || caps[0].to_string(),
                    |(_, file)| format!("[[File:{file}|20px|link=]]"),
                )
        })
        .into_owned()
}

/// Bold, italic and strikethrough. Spans never cross a line break.
///
/// # Examples
///
/// ```
/// use discordwiki::inline::render_emphasis;
///
/// assert_eq!(render_emphasis("**Bold** and *it*"), "'''Bold''' and ''it''");
/// ```
#[must_use]
pub fn render_emphasis(text: &str) -> String {
    let text = replace_outside_urls(&BOLD_ITALIC_RE, text, "'''''$1'''''");
    let text = replace_outside_urls(&BOLD_RE, &text, "'''$1'''");
    let text = replace_outside_urls(&ITALIC_STAR_RE, &text, "''$1''");
    let text = ITALIC_UNDERSCORE_RE.replace_all(&text, |caps: &Captures<'_>| {
        let Some(whole) = caps.get(0) else {
            return String::new();
        };
        if intraword(&text, whole.start(), whole.end()) || inside_url(&text, whole.start()) {
            whole.as_str().to_string()
        } else {
            format!("''{}''", &caps[1])
        }
    });
    replace_outside_urls(&STRIKE_RE, &text, "<s>$1</s>")
}

/// `replace_all` that leaves matches starting inside a URL untouched.
fn replace_outside_urls(re: &Regex, text: &str, replacement: &str) -> String {
    re.replace_all(text, |caps: &Captures<'_>| {
        let Some(whole) = caps.get(0) else {
            return String::new();
        };
        if inside_url(text, whole.start()) {
            return whole.as_str().to_string();
        }
        let mut out = String::new();
        caps.expand(replacement, &mut out);
        out
    })
    .into_owned()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn intraword(text: &str, start: usize, end: usize) -> bool {
    text[..start].chars().next_back().is_some_and(is_word_char)
        || text[end..].chars().next().is_some_and(is_word_char)
}

fn inside_url(text: &str, start: usize) -> bool {
    let word_start = text[..start]
        .rfind(char::is_whitespace)
        .map_or(0, |idx| idx + 1);
    text[word_start..start].contains("://")
}

/// Every inline transform in converter order, for text without links,
/// headings or block constructs.
///
/// # Examples
///
/// ```
/// use discordwiki::{inline::apply_inline_formatting, model::AuthorDirectory};
///
/// let out = apply_inline_formatting("__**hi**__ a|b", &AuthorDirectory::default());
/// assert_eq!(out, "<u>'''hi'''</u> a{{!}}b");
/// ```
#[must_use]
pub fn apply_inline_formatting(text: &str, authors: &AuthorDirectory) -> String {
    let mut protected = Protected::default();
    let text = escape_templates(&Protected::sanitize(text), &mut protected);
    let text = escape_pipes(&text);
    let text = extract_code(&text, &mut protected);
    let text = convert_spoilers(&text);
    let text = convert_inline_markup(&text, authors);
    let text = convert_voting_icons(&text);
    let text = render_emphasis(&text);
    protected.restore(&text)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::model::AuthorRecord;

    fn authors() -> AuthorDirectory {
        AuthorDirectory::new(vec![AuthorRecord {
            member_id: "123".into(),
            wiki_account: "Ironwestie".into(),
            display_name: "Iron Westie".into(),
        }])
    }

    #[rstest]
    #[case("**Bold**", "'''Bold'''")]
    #[case("*it* and _it_", "''it'' and ''it''")]
    #[case("***both***", "'''''both'''''")]
    #[case("~~gone~~", "<s>gone</s>")]
    #[case("*a **b** c*", "''a '''b''' c''")]
    #[case("snake_case_name", "snake_case_name")]
    #[case("2 * 3 * 4", "2 * 3 * 4")]
    #[case("**unclosed", "**unclosed")]
    #[case("**a\nb**", "**a\nb**")]
    fn emphasis(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(render_emphasis(input), expected);
    }

    #[rstest]
    #[case("[https://example.com/_x_ label]")]
    #[case("https://x.com/**a**")]
    #[case("https://x.com/*a*")]
    #[case("https://x.com/~~a~~")]
    fn markers_inside_url_are_kept(#[case] input: &str) {
        assert_eq!(render_emphasis(input), input);
    }

    #[rstest]
    #[case("see https://example.com/__init__.py")]
    #[case("https://x.com/__**a**__")]
    fn underline_inside_url_is_kept(#[case] input: &str) {
        assert_eq!(convert_underline(input), input);
    }

    #[rstest]
    #[case(r"\*not italic\* and \_x\_", "*not italic* and _x_")]
    #[case(r"\*\*not bold\*\*", "**not bold**")]
    #[case(r"\~\~kept\~\~", "~~kept~~")]
    #[case(r"\`x\`", "`x`")]
    #[case(r"`a\*b`", r"<code>a\*b</code>")]
    #[case(r"\a stays", r"\a stays")]
    fn backslash_escapes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(
            apply_inline_formatting(input, &AuthorDirectory::default()),
            expected
        );
    }

    #[test]
    fn raw_placeholder_marks_are_dropped() {
        let out = apply_inline_formatting("a \u{0}0\u{0} b {{Foo}}", &authors());
        assert_eq!(out, "a 0 b {{t|Foo}}");
    }

    #[rstest]
    #[case("__***x***__", "<u>'''''x'''''</u>")]
    #[case("__**x**__", "<u>'''x'''</u>")]
    #[case("__*x*__", "<u>''x''</u>")]
    #[case("__x__", "<u>x</u>")]
    #[case("__**a**__ and __b__", "<u>'''a'''</u> and <u>b</u>")]
    fn underline(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(convert_underline(input), expected);
    }

    #[rstest]
    #[case("hi <@123>", "hi [[User:Ironwestie|Iron Westie]]")]
    #[case("hi <@!123>", "hi [[User:Ironwestie|Iron Westie]]")]
    #[case("hi <@999>", "hi <@999>")]
    #[case("see <#42>", "see #42")]
    #[case("ping <@&7>", "ping @7")]
    fn mentions(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(convert_mentions(input, &authors()), expected);
    }

    #[rstest]
    #[case(":support:", "[[File:Voting-support.svg|20px|link=]]")]
    #[case(
        ":restructure: :oppose:",
        "[[File:Voting-restructure.svg|20px|link=]] [[File:Voting-oppose.svg|20px|link=]]"
    )]
    #[case(":smile:", ":smile:")]
    fn voting_icons(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(convert_voting_icons(input), expected);
    }

    #[test]
    fn custom_emoji_become_shortcodes() {
        assert_eq!(
            convert_custom_emoji("<:support:123> <a:party:456>"),
            ":support: :party:"
        );
    }

    #[rstest]
    #[case("a|b", "a{{!}}b")]
    #[case("||spoiler||", "||spoiler||")]
    #[case("|||", "|||")]
    fn pipes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_pipes(input), expected);
    }

    #[test]
    fn templates_are_displayed_and_protected() {
        let mut protected = Protected::default();
        let out = escape_templates("{{Foo|bar=1}} {{t|Baz}}", &mut protected);
        let out = escape_pipes(&out);
        assert_eq!(protected.restore(&out), "{{t|Foo|bar=1}} {{t|Baz}}");
    }

    #[test]
    fn fenced_code_trims_newlines_and_language() {
        let mut protected = Protected::default();
        let out = extract_code("```rust\nfn main() {}\n```", &mut protected);
        assert_eq!(protected.restore(&out), "<pre>fn main() {}</pre>");
        let out = extract_code("```\n**x**\n```", &mut protected);
        assert_eq!(render_emphasis(&out), out);
        assert_eq!(protected.restore(&out), "<pre>**x**</pre>");
    }

    #[test]
    fn pre_blocks_unescape_pipes() {
        let mut protected = Protected::default();
        let out = extract_code(&escape_pipes("```a|b```"), &mut protected);
        assert_eq!(protected.restore(&out), "<pre>a|b</pre>");
    }

    #[test]
    fn inline_code_is_protected() {
        let mut protected = Protected::default();
        let out = extract_code("run `*x*` now", &mut protected);
        let out = render_emphasis(&out);
        assert_eq!(protected.restore(&out), "run <code>*x*</code> now");
    }

    #[test]
    fn nested_placeholders_restore() {
        let mut protected = Protected::default();
        let inner = protected.stash("inner".into());
        let outer = protected.stash(format!("<code>{inner}</code>"));
        assert_eq!(protected.restore(&outer), "<code>inner</code>");
    }

    #[test]
    fn spoilers_and_subtext() {
        assert_eq!(
            convert_spoilers("a ||secret\nline|| b"),
            "a <div class=\"spoiler\">secret\nline</div> b"
        );
        assert_eq!(
            convert_subtext("text\n-# small print"),
            "text\n<small>small print</small>"
        );
    }

    #[test]
    fn triple_equals_is_nowiki() {
        assert_eq!(escape_triple_equals("a === b"), "a <nowiki>===</nowiki> b");
    }

    #[test]
    fn full_inline_set() {
        let out = apply_inline_formatting(
            "**hey** <@123> :support: `a|b` ~~no~~",
            &authors(),
        );
        assert_eq!(
            out,
            "'''hey''' [[User:Ironwestie|Iron Westie]] [[File:Voting-support.svg|20px|link=]] \
             <code>a{{!}}b</code> <s>no</s>"
        );
    }
}
