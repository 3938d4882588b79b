//! Allow-list HTML sanitization for user-submitted text.
//!
//! Only `p`, `br`, `strong`, `em`, `ul`, `ol` and `li` survive, and they lose
//! every attribute. Other tags are dropped while their text is kept, except
//! `script` and `style` whose content is removed too. Stray angle brackets
//! are escaped.

use std::sync::LazyLock;

use regex::Regex;

/// Tags kept by [`sanitize_html`].
pub const ALLOWED_TAGS: &[&str] = &["p", "br", "strong", "em", "ul", "ol", "li"];

#[allow(clippy::expect_used)]
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--[\s\S]*?-->|<(/?)([a-zA-Z][a-zA-Z0-9]*)\b[^<>]*>").expect("valid tag regex")
});

#[allow(clippy::expect_used)]
static RAW_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("valid raw text regex")
});

/// Clean `input` down to the allowed tag set.
#[must_use]
pub fn sanitize_html(input: &str) -> String {
    let without_raw = RAW_TEXT_RE.replace_all(input, "");
    let mut out = String::with_capacity(without_raw.len());
    let mut last = 0;

    for caps in TAG_RE.captures_iter(&without_raw) {
        let Some(whole) = caps.get(0) else { continue };
        push_escaped(&mut out, &without_raw[last..whole.start()]);
        last = whole.end();

        let Some(name) = caps.get(2) else {
            // comment
            continue;
        };
        let name = name.as_str().to_ascii_lowercase();
        if ALLOWED_TAGS.contains(&name.as_str()) {
            let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
            if closing {
                if name != "br" {
                    out.push_str("</");
                    out.push_str(&name);
                    out.push('>');
                }
            } else {
                out.push('<');
                out.push_str(&name);
                out.push('>');
            }
        }
    }
    push_escaped(&mut out, &without_raw[last..]);
    out
}

fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}
