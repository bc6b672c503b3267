//! Rewrite wiki and external URLs into wikitext links.
//!
//! Four shapes are recognised, resolved in this order so the URL inside an
//! angle-bracket form is never seen again by the bare-URL pass:
//!
//! 1. `[label](<url>)`: masked link with embedding suppressed
//! 2. `<url>`: raw URL with embedding suppressed
//! 3. `[label](url)`: ordinary masked link
//! 4. a bare URL
//!
//! URLs under the configured wiki base become internal links, templates or
//! category links. Anything off-site becomes an external link when it has a
//! label and is otherwise left for the wiki's own autolinking.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::lazy_regex;

/// Default wiki article path.
pub const DEFAULT_WIKI_BASE: &str = "https://siivagunner.fandom.com/wiki/";

static MASKED_ANGLE_RE: LazyLock<Regex> = lazy_regex!(
    r"\[([^\]]+)\]\(<(https?://[^>\s]+)>\)",
    "masked angle link regex"
);

static ANGLE_URL_RE: LazyLock<Regex> =
    lazy_regex!(r"<(https?://[^>\s]+)>", "angle url regex");

// One level of balanced parentheses is allowed inside the URL.
static MARKDOWN_LINK_RE: LazyLock<Regex> = lazy_regex!(
    r"\[([^\]]+)\]\((https?://(?:[^()\s]|\([^()\s]*\))+)\)",
    "markdown link regex"
);

/// What a URL points at, relative to the wiki.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    Template(String),
    Category(String),
    Page(String),
    /// On the wiki's host but outside the article path.
    SameSite,
    External,
}

/// Resolves chat links against one wiki.
#[derive(Debug, Clone)]
pub struct LinkResolver {
    base: String,
    root: String,
    bare_re: Regex,
}

impl Default for LinkResolver {
    fn default() -> Self {
        Self::new(DEFAULT_WIKI_BASE)
    }
}

impl LinkResolver {
    /// Build a resolver for the article path `base`, e.g.
    /// `https://example.fandom.com/wiki/`.
    ///
    /// # Panics
    /// Panics if the bare-URL pattern built from `base` fails to compile,
    /// which cannot happen because the base is escaped.
    #[must_use]
    pub fn new(base: &str) -> Self {
        let mut base = base.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let root = base
            .strip_suffix("wiki/")
            .map_or_else(|| base.clone(), str::to_string);
        let bare_re = Regex::new(&format!(r"{}([^\s\[\]{{}}<>|]+)", regex::escape(&base)))
            .expect("escaped wiki base is a valid regex");
        Self {
            base,
            root,
            bare_re,
        }
    }

    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Classify `url` against the wiki base.
    ///
    /// # Examples
    ///
    /// ```
    /// use discordwiki::links::{LinkResolver, LinkTarget};
    ///
    /// let links = LinkResolver::default();
    /// assert_eq!(
    ///     links.classify("https://siivagunner.fandom.com/wiki/Category:Katamari_Damacy"),
    ///     LinkTarget::Category("Katamari Damacy".into())
    /// );
    /// ```
    #[must_use]
    pub fn classify(&self, url: &str) -> LinkTarget {
        let Some(rest) = url.strip_prefix(&self.base) else {
            return if url.starts_with(&self.root) {
                LinkTarget::SameSite
            } else {
                LinkTarget::External
            };
        };
        if let Some(name) = rest.strip_prefix("Template:") {
            LinkTarget::Template(page_name(name))
        } else if let Some(name) = rest.strip_prefix("Category:") {
            LinkTarget::Category(page_name(name))
        } else if rest.is_empty() {
            LinkTarget::SameSite
        } else {
            LinkTarget::Page(page_name(rest))
        }
    }

    /// Apply all four link shapes to `text`.
    #[must_use]
    pub fn resolve_links(&self, text: &str) -> String {
        let text = MASKED_ANGLE_RE.replace_all(text, |caps: &Captures<'_>| {
            self.labelled(&caps[2], &caps[1])
                .unwrap_or_else(|| caps[0].to_string())
        });
        let text = ANGLE_URL_RE.replace_all(&text, |caps: &Captures<'_>| {
            let url = &caps[1];
            match self.classify(url) {
                LinkTarget::External => url.to_string(),
                target => unlabelled(&target).unwrap_or_else(|| caps[0].to_string()),
            }
        });
        let text = MARKDOWN_LINK_RE.replace_all(&text, |caps: &Captures<'_>| {
            self.labelled(&caps[2], &caps[1])
                .unwrap_or_else(|| caps[0].to_string())
        });
        self.resolve_bare_urls(&text)
    }

    /// Convert bare wiki URLs that no other shape claimed.
    #[must_use]
    pub fn resolve_bare_urls(&self, text: &str) -> String {
        self.bare_re
            .replace_all(text, |caps: &Captures<'_>| {
                unlabelled(&self.classify(&caps[0])).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    fn labelled(&self, url: &str, label: &str) -> Option<String> {
        match self.classify(url) {
            LinkTarget::Template(name) => Some(format!("[[Template:{name}|{label}]]")),
            LinkTarget::Category(name) => Some(format!("[[:Category:{name}|{label}]]")),
            LinkTarget::Page(name) => Some(format!("[[{name}|{label}]]")),
            LinkTarget::External => Some(format!("[{url} {label}]")),
            LinkTarget::SameSite => None,
        }
    }
}

fn unlabelled(target: &LinkTarget) -> Option<String> {
    match target {
        LinkTarget::Template(name) => Some(format!("{{{{t|{name}}}}}")),
        LinkTarget::Category(name) => Some(format!("[[:Category:{name}]]")),
        LinkTarget::Page(name) => Some(format!("[[{name}]]")),
        LinkTarget::SameSite | LinkTarget::External => None,
    }
}

fn page_name(raw: &str) -> String {
    raw.replace('_', " ")
}
