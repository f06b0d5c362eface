//! Doc comment body parser: description prefix plus `@tag` clauses.
//!
//! Never fails: a clause with missing pieces comes back with empty fields.

use crate::model::{Clause, Doclet, InlineLink, TagKind};
use regex::Regex;
use std::sync::LazyLock;

// A clause starts at a line beginning with `@name`.
static RE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@([A-Za-z][A-Za-z0-9]*)\b(.*)$").unwrap());

static RE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{@link(?:plain|code)?\s+([^\s}|]+)(?:\s*\|?\s*([^}]*))?\}").unwrap()
});

/// Parse the inner text of a `/** ... */` comment.
///
/// `first_line` is the source line of the opening `/**`, used to number clauses.
pub fn parse(text: &str, first_line: usize) -> Doclet {
    let mut description: Vec<&str> = Vec::new();
    // (tag, line, accumulated lines)
    let mut pending: Vec<(String, usize, Vec<&str>)> = Vec::new();

    for (idx, raw) in text.split('\n').enumerate() {
        let line = strip_margin(raw);
        if let Some(caps) = RE_TAG.captures(line) {
            let tag = caps[1].to_string();
            let rest = caps.get(2).map_or("", |m| m.as_str());
            pending.push((tag, first_line + idx, vec![rest]));
            continue;
        }
        match pending.last_mut() {
            Some((_, _, lines)) => lines.push(line),
            None => description.push(line),
        }
    }

    let description = description.join("\n").trim().to_string();
    let links = extract_links(&description);
    let clauses = pending
        .into_iter()
        .map(|(tag, line, lines)| build_clause(tag, line, &lines.join("\n")))
        .collect();

    Doclet {
        description,
        links,
        clauses,
    }
}

/// Strip indentation and the leading `*` margin (plus one space) from a line.
fn strip_margin(line: &str) -> &str {
    let line = line.trim_end();
    let trimmed = line.trim_start();
    match trimmed.strip_prefix('*') {
        Some(rest) => rest
            .strip_prefix(' ')
            .or_else(|| rest.strip_prefix('\t'))
            .unwrap_or(rest),
        None => trimmed,
    }
}

fn build_clause(tag: String, line: usize, body: &str) -> Clause {
    let body = body.trim();
    let links = extract_links(body);
    let kind = TagKind::from_name(&tag);

    let (type_expr, rest) = match kind {
        TagKind::Param | TagKind::Returns | TagKind::Throws | TagKind::Type | TagKind::Extends => {
            take_type(body)
        }
        _ => (None, body),
    };

    let (name, description) = if kind == TagKind::Param {
        let (name, desc) = split_first_word(rest);
        (Some(name.to_string()), desc.to_string())
    } else {
        (None, rest.to_string())
    };

    Clause {
        tag,
        name,
        type_expr,
        description,
        links,
        line,
    }
}

/// Take a leading `{Type}` expression, honoring nested braces.
fn take_type(text: &str) -> (Option<String>, &str) {
    if !text.starts_with('{') || text.starts_with("{@") {
        return (None, text);
    }
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let inner = text[1..i].trim().to_string();
                    return (Some(inner), text[i + 1..].trim_start());
                }
            }
            _ => {}
        }
    }
    (None, text)
}

fn split_first_word(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(i) => (&text[..i], text[i..].trim()),
        None => (text, ""),
    }
}

/// Collect `{@link Target label}` occurrences. The markup itself stays in the text.
pub fn extract_links(text: &str) -> Vec<InlineLink> {
    RE_LINK
        .captures_iter(text)
        .map(|caps| InlineLink {
            target: caps[1].to_string(),
            label: caps
                .get(2)
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })
        .collect()
}

/// The target named by a `@see` clause: a bare name or an inline link.
pub fn see_target(clause: &Clause) -> (String, String) {
    if let Some(link) = clause.links.first() {
        if clause.description.trim_start().starts_with("{@link") {
            let rest = RE_LINK.replace(&clause.description, "").trim().to_string();
            return (link.target.clone(), rest);
        }
    }
    let (target, rest) = split_first_word(&clause.description);
    (target.to_string(), rest.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn description_then_clauses() {
        let doc = parse(
            "\n * Set the color for this Shape\n * @param color The color to set\n * @param other There is no other param\n * @throws NonExistantColorException (no, not really!)\n ",
            10,
        );
        assert_eq!(doc.description, "Set the color for this Shape");
        assert_eq!(doc.clauses.len(), 3);
        assert_eq!(doc.clauses[0].name.as_deref(), Some("color"));
        assert_eq!(doc.clauses[0].description, "The color to set");
        assert_eq!(doc.clauses[0].line, 12);
        assert_eq!(doc.clauses[1].name.as_deref(), Some("other"));
        assert_eq!(doc.clauses[2].kind(), TagKind::Throws);
        assert_eq!(
            doc.clauses[2].description,
            "NonExistantColorException (no, not really!)"
        );
    }

    #[test]
    fn repeated_params_keep_order() {
        let body: String = (0..5)
            .map(|i| format!("\n * @param p{i} desc {i}"))
            .collect();
        let doc = parse(&body, 1);
        let names: Vec<_> = doc.clauses.iter().filter_map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["p0", "p1", "p2", "p3", "p4"]);
    }

    #[test]
    fn argument_is_param_synonym() {
        let doc = parse("\n * @argument coordinates The coordinates to set", 1);
        assert_eq!(doc.clauses[0].tag, "argument");
        assert_eq!(doc.clauses[0].kind(), TagKind::Param);
        assert_eq!(doc.clauses[0].name.as_deref(), Some("coordinates"));
    }

    #[test]
    fn multiline_clause_continues_until_next_tag() {
        let doc = parse(
            "\n * @returns A Coordinate object\n *   for this shape\n * @see #setColor",
            1,
        );
        assert_eq!(doc.clauses[0].description, "A Coordinate object\n  for this shape");
        assert_eq!(doc.clauses[1].description, "#setColor");
    }

    #[test]
    fn single_line_comment_body() {
        let doc = parse(" This is another inner ", 3);
        assert_eq!(doc.description, "This is another inner");
        assert!(doc.clauses.is_empty());
    }

    #[test]
    fn bare_param_is_empty_not_error() {
        let doc = parse("\n * @param\n * @constructor", 1);
        assert_eq!(doc.clauses[0].name.as_deref(), Some(""));
        assert_eq!(doc.clauses[0].description, "");
        assert!(doc.is_constructor());
    }

    #[test]
    fn type_expressions() {
        let doc = parse(
            "\n * @param {Object.<string, {x: number}>} opts Options\n * @returns {Number} area",
            1,
        );
        assert_eq!(
            doc.clauses[0].type_expr.as_deref(),
            Some("Object.<string, {x: number}>")
        );
        assert_eq!(doc.clauses[0].name.as_deref(), Some("opts"));
        assert_eq!(doc.clauses[1].type_expr.as_deref(), Some("Number"));
        assert_eq!(doc.clauses[1].description, "area");
    }

    #[test]
    fn inline_links_are_extracted_not_removed() {
        let doc = parse("\n * A Square is a subclass of {@link Rectangle}", 1);
        assert_eq!(doc.description, "A Square is a subclass of {@link Rectangle}");
        assert_eq!(
            doc.links,
            vec![InlineLink {
                target: "Rectangle".to_string(),
                label: None
            }]
        );
    }

    #[test]
    fn link_labels() {
        let links = extract_links("see {@link Shape#getColor the getter} and {@link Circle|circles}");
        assert_eq!(links[0].target, "Shape#getColor");
        assert_eq!(links[0].label.as_deref(), Some("the getter"));
        assert_eq!(links[1].label.as_deref(), Some("circles"));
    }

    #[test]
    fn unknown_and_case_sensitive_tags_are_kept() {
        let doc = parse("\n * @Param x nope\n * @custom whatever", 1);
        assert_eq!(doc.clauses[0].kind(), TagKind::Other);
        assert_eq!(doc.clauses[0].name, None);
        assert_eq!(doc.clauses[1].tag, "custom");
    }

    #[test]
    fn mid_line_at_is_not_a_tag() {
        let doc = parse("\n * mail me at someone@example.com\n * &#64;constructor", 1);
        assert!(doc.clauses.is_empty());
    }

    #[test]
    fn see_with_link() {
        let doc = parse("\n * @see {@link Shape} for details", 1);
        let (target, rest) = see_target(&doc.clauses[0]);
        assert_eq!(target, "Shape");
        assert_eq!(rest, "for details");
    }
}
