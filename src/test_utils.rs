//! Helper utilities for unit tests.

/// Collect string literals into a `Vec<String>`, one element per line.
#[macro_export]
macro_rules! string_vec {
    ( $($elem:expr),* $(,)? ) => {
        vec![ $( ::std::string::ToString::to_string(&$elem) ),* ]
    };
}
