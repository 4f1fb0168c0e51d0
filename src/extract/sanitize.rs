// src/extract/sanitize.rs

// --- Imports ---
use ego_tree::NodeRef;
use scraper::{node::Node, Html};
use std::collections::HashSet;

/// Tags that survive cell sanitization. Strikethrough carries meaning on
/// the monitor (cancelled entries), so it must not be stripped with the
/// rest of the markup.
const DEFAULT_ALLOWED_TAGS: [&str; 6] = ["s", "del", "b", "strong", "span", "br"];

const LINE_THROUGH_STYLE: &str = "text-decoration:line-through";

/// Cleans the inner markup of a single table cell.
///
/// Everything outside the allow-list is unwrapped rather than deleted:
/// the tag goes, its children stay, so text content is never lost.
/// Sanitizing already-sanitized markup is a no-op.
#[derive(Debug, Clone)]
pub struct CellSanitizer {
    allowed: HashSet<String>,
}

impl Default for CellSanitizer {
    fn default() -> Self {
        Self::new(&DEFAULT_ALLOWED_TAGS)
    }
}

impl CellSanitizer {
    pub fn new(allowed_tags: &[&str]) -> Self {
        Self {
            allowed: allowed_tags.iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    /// Markup-preserving rendition: allow-listed tags kept, attributes
    /// stripped (except a strikethrough style on `span`), whitespace runs
    /// collapsed.
    pub fn sanitize_html(&self, raw: &str) -> String {
        let fragment = Html::parse_fragment(raw);
        let mut out = String::new();
        for child in fragment.root_element().children() {
            self.emit_markup(child, &mut out);
        }
        collapse_ws(&out)
    }

    /// Plain-text rendition: markup fully stripped, whitespace collapsed.
    pub fn sanitize_text(&self, raw: &str) -> String {
        strip_markup(raw)
    }

    fn emit_markup(&self, node: NodeRef<'_, Node>, out: &mut String) {
        match node.value() {
            Node::Text(text) => out.push_str(&escape_text(&text.text)),
            Node::Element(el) => {
                // Legacy strikethrough spelling folds into the canonical tag.
                let name = match el.name() {
                    "strike" => "s",
                    other => other,
                };
                if name == "script" || name == "style" {
                    return; // content removed outright
                }
                if !self.allowed.contains(name) {
                    // Unwrap: promote children in place, discard the tag.
                    for child in node.children() {
                        self.emit_markup(child, out);
                    }
                    return;
                }
                if name == "br" {
                    out.push_str("<br>");
                    return;
                }
                out.push('<');
                out.push_str(name);
                if name == "span" {
                    // A span only keeps its style when it encodes strikethrough.
                    if el.attr("style").is_some_and(|s| s.contains("line-through")) {
                        out.push_str(&format!(" style=\"{}\"", LINE_THROUGH_STYLE));
                    }
                }
                out.push('>');
                for child in node.children() {
                    self.emit_markup(child, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            _ => {} // comments, doctypes etc. are dropped
        }
    }
}

/// Strips all markup from an HTML fragment, leaving collapsed plain text.
/// Text chunks from adjacent nodes are joined with a single space.
pub fn strip_markup(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);
    let mut pieces: Vec<String> = Vec::new();
    collect_text(*fragment.root_element(), &mut pieces);
    collapse_ws(&pieces.join(" "))
}

fn collect_text(node: NodeRef<'_, Node>, pieces: &mut Vec<String>) {
    match node.value() {
        Node::Text(text) => {
            let t = text.text.trim();
            if !t.is_empty() {
                pieces.push(t.to_string());
            }
        }
        Node::Element(el) => {
            if el.name() == "script" || el.name() == "style" {
                return;
            }
            for child in node.children() {
                collect_text(child, pieces);
            }
        }
        _ => {
            for child in node.children() {
                collect_text(child, pieces);
            }
        }
    }
}

/// Collapses whitespace runs to a single space and trims.
pub fn collapse_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_strikethrough_and_unwraps_the_rest() {
        let sanitizer = CellSanitizer::default();
        let html = sanitizer.sanitize_html(r#"<div class="c"><s>Mathe</s> <i>fällt aus</i></div>"#);
        assert_eq!(html, "<s>Mathe</s> fällt aus");
    }

    #[test]
    fn canonicalizes_legacy_strike_tag() {
        let sanitizer = CellSanitizer::default();
        assert_eq!(sanitizer.sanitize_html("<strike>8c</strike>"), "<s>8c</s>");
    }

    #[test]
    fn span_keeps_only_line_through_style() {
        let sanitizer = CellSanitizer::default();
        let kept = sanitizer.sanitize_html(
            r#"<span style="color:red; text-decoration:line-through">Müller</span>"#,
        );
        assert_eq!(kept, r#"<span style="text-decoration:line-through">Müller</span>"#);

        let dropped = sanitizer.sanitize_html(r#"<span style="color:red">Müller</span>"#);
        assert_eq!(dropped, "<span>Müller</span>");
    }

    #[test]
    fn removes_script_and_style_content() {
        let sanitizer = CellSanitizer::default();
        let html = sanitizer.sanitize_html("vorher<script>alert(1)</script><style>td{}</style>nachher");
        assert_eq!(html, "vorhernachher");
    }

    #[test]
    fn no_text_is_lost_when_unwrapping() {
        let sanitizer = CellSanitizer::default();
        let html = sanitizer.sanitize_html(r##"<a href="#x">Raum</a> <u>204</u>"##);
        assert_eq!(html, "Raum 204");
    }

    #[test]
    fn sanitizer_is_idempotent() {
        let sanitizer = CellSanitizer::default();
        let inputs = [
            r#"<div><strike>Mathe</strike> &amp; <span style="text-decoration:line-through">Sport</span></div>"#,
            "plain   text\n with   runs",
            "<b>fett</b><br><em>kursiv</em>",
        ];
        for raw in inputs {
            let once = sanitizer.sanitize_html(raw);
            let twice = sanitizer.sanitize_html(&once);
            assert_eq!(once, twice, "sanitize not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn plain_text_strips_all_markup() {
        let sanitizer = CellSanitizer::default();
        assert_eq!(sanitizer.sanitize_text("<s>Mathe</s>"), "Mathe");
        assert_eq!(strip_markup("  <b>Frau</b>\n<i>Müller</i> "), "Frau Müller");
    }

    #[test]
    fn collapse_ws_flattens_runs() {
        assert_eq!(collapse_ws("  a \t b\n\nc "), "a b c");
        assert_eq!(collapse_ws(""), "");
    }
}
