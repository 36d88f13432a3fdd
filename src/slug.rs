//! Defines the [`Slugifier`], which converts post titles into URL-safe
//! tokens for output file names.

use regex::Regex;

/// Converts titles into ASCII, hyphen-delimited slugs. The slug keeps the
/// title's case, so `Hello, World!` becomes `Hello-World`.
#[derive(Clone, Debug)]
pub struct Slugifier {
    non_word: Regex,
    hyphens: Regex,
}

impl Default for Slugifier {
    fn default() -> Self {
        Slugifier::new()
    }
}

impl Slugifier {
    pub fn new() -> Slugifier {
        Slugifier {
            // the patterns are literals; failing to compile them is a bug
            non_word: Regex::new(r"[^A-Za-z0-9_]+").unwrap(),
            hyphens: Regex::new(r"-{2,}").unwrap(),
        }
    }

    /// Slugifies `title`. Non-ASCII characters are transliterated where
    /// [`deunicode`] knows an equivalent and dropped otherwise. The result may
    /// be empty; callers that need a file name must supply their own
    /// fallback.
    pub fn slugify(&self, title: &str) -> String {
        let ascii = deunicode::deunicode_with_tofu(title, "");
        let hyphenated = self.non_word.replace_all(&ascii, "-");
        let collapsed = self.hyphens.replace_all(&hyphenated, "-");
        collapsed.trim_matches('-').to_owned()
    }
}
