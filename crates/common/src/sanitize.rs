//! Rich-text sanitization.
//!
//! Question bodies, suggestions, and tips arrive as editor-generated HTML.
//! They are cleaned exactly once, on the write path, so every stored value
//! is safe markup and no reader has to sanitize again.

use once_cell::sync::Lazy;

static CLEANER: Lazy<ammonia::Builder<'static>> = Lazy::new(|| {
    let mut builder = ammonia::Builder::default();
    builder
        .add_tags(["u", "s", "mark"])
        .add_tag_attributes("code", ["class"])
        .add_tag_attributes("pre", ["class"])
        .link_rel(Some("noopener noreferrer"));
    builder
});

/// Sanitize an HTML fragment for storage.
///
/// Scripts, event handlers, and unknown tags are stripped; formatting and
/// links used by the rich-text editor survive.
#[must_use]
pub fn sanitize_rich_text(input: &str) -> String {
    CLEANER.clean(input).to_string()
}

/// Sanitize an optional HTML fragment, mapping blank input to `None`.
#[must_use]
pub fn sanitize_optional(input: Option<&str>) -> Option<String> {
    input
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(sanitize_rich_text)
}
