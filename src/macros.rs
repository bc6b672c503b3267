//! Helper macros used across the crate.

/// Lazily compile a [`Regex`] with a custom panic message.
///
/// The pattern is compiled on first use and shared by every conversion.
///
/// # Examples
///
/// ```
/// use std::sync::LazyLock;
///
/// use regex::Regex;
/// static MENTION: LazyLock<Regex> = discordwiki::lazy_regex!(r"<@!?(\d+)>", "mention regex");
/// assert!(MENTION.is_match("hi <@123>"));
/// ```
///
/// [`Regex`]: regex::Regex
#[macro_export]
macro_rules! lazy_regex {
    ($pattern:expr, $msg:expr $(,)?) => {
        LazyLock::new(|| Regex::new($pattern).expect($msg))
    };
}
