//! Structural recognizer: classifies the code right after a comment.
//!
//! Each rule is an anchored regex tried in a fixed order; the first match
//! wins. Only the statement head is inspected, bodies are never parsed.

use crate::model::{AssignedValue, Construct};
use regex::Regex;
use std::sync::LazyLock;

// -- Regex patterns -----------------------------------------------------------

// `function Name(` ... `) {`
static RE_FUNC_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^function\s*\*?\s*([A-Za-z_$][\w$]*)\s*\(").unwrap());

// `var Name = function(` ... `) {`
static RE_FUNC_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:var|let|const)\s+([A-Za-z_$][\w$]*)\s*=\s*",
        r"function\b\s*\*?\s*(?:[A-Za-z_$][\w$]*)?\s*\("
    ))
    .unwrap()
});

// `Owner.prototype.member =`
static RE_PROTO_MEMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*?)\.prototype\.([A-Za-z_$][\w$]*)\s*=")
        .unwrap()
});

// `Owner.prototype = new Base(`
static RE_PROTO_NEW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*?)\.prototype\s*=\s*",
        r"new\s+([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*)"
    ))
    .unwrap()
});

// `Owner.prototype = Object.create(Base.prototype)`
static RE_PROTO_CREATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*?)\.prototype\s*=\s*",
        r"Object\.create\(\s*([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*?)\.prototype\s*\)"
    ))
    .unwrap()
});

// `Owner.member =`
static RE_STATIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*)\.([A-Za-z_$][\w$]*)\s*=").unwrap()
});

// `this.member =`
static RE_THIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^this\.([A-Za-z_$][\w$]*)\s*=").unwrap());

// Right-hand sides
static RE_RHS_FUNC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^function\b\s*\*?\s*(?:[A-Za-z_$][\w$]*)?\s*\(").unwrap()
});

static RE_RHS_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*)[ \t]*(?:;|\r?\n|$|//|/\*|\})").unwrap()
});

/// Identifiers that are values, not references to functions.
const LITERAL_WORDS: &[&str] = &["null", "undefined", "true", "false", "NaN", "Infinity", "this"];

/// Where the code being classified lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// Top level of the file.
    Global,
    /// Inside the body of a `@constructor` function, plain blocks included.
    ConstructorBody(&'a str),
}

// -- Public API ---------------------------------------------------------------

/// Classify the statement starting at the beginning of `code`.
pub fn recognize(code: &str, scope: Scope<'_>) -> Option<Construct> {
    if let Scope::ConstructorBody(class) = scope {
        if let Some(construct) = recognize_closure_member(code, class) {
            return Some(construct);
        }
    } else if let Some(construct) = recognize_function(code) {
        return Some(construct);
    }
    recognize_assignment(code)
}

/// Rule 1: function declarations and variable-bound function expressions.
fn recognize_function(code: &str) -> Option<Construct> {
    if let Some(caps) = RE_FUNC_DECL.captures(code) {
        let (params, body_open) = signature(code, caps[0].len())?;
        return Some(Construct::FunctionDeclaration {
            name: caps[1].to_string(),
            params,
            body_open,
        });
    }
    if let Some(caps) = RE_FUNC_VAR.captures(code) {
        let (params, body_open) = signature(code, caps[0].len())?;
        return Some(Construct::FunctionExpression {
            name: caps[1].to_string(),
            params,
            body_open,
        });
    }
    None
}

/// Parameters and body brace of a function whose `(` ends just before `start`.
fn signature(code: &str, start: usize) -> Option<(Vec<String>, usize)> {
    let close = closing_paren(code, start)?;
    let rest = &code[close + 1..];
    let body_open = close + 1 + (rest.len() - rest.trim_start().len());
    code[body_open..]
        .starts_with('{')
        .then(|| (split_params(&code[start..close]), body_open))
}

/// Rules 2-4: prototype members, prototype replacement, static members.
fn recognize_assignment(code: &str) -> Option<Construct> {
    if let Some(caps) = RE_PROTO_MEMBER.captures(code) {
        let value = classify_value(&code[caps[0].len()..])?;
        return Some(Construct::PropertyAssignment {
            owner: caps[1].to_string(),
            member: caps[2].to_string(),
            value,
        });
    }

    if let Some(caps) = RE_PROTO_NEW
        .captures(code)
        .or_else(|| RE_PROTO_CREATE.captures(code))
    {
        return Some(Construct::PrototypeReplacement {
            class: caps[1].to_string(),
            base: caps[2].to_string(),
        });
    }

    if let Some(caps) = RE_STATIC.captures(code) {
        let owner = &caps[1];
        let member = &caps[2];
        let is_prototype = member == "prototype" || owner.split('.').any(|p| p == "prototype");
        if is_prototype || owner == "this" || owner.starts_with("this.") {
            return None;
        }
        let value = classify_value(&code[caps[0].len()..])?;
        return Some(Construct::StaticAssignment {
            owner: owner.to_string(),
            member: member.to_string(),
            value,
        });
    }

    None
}

/// Rule 5: `this.x = ...` and inner functions inside a constructor body.
fn recognize_closure_member(code: &str, class: &str) -> Option<Construct> {
    if let Some(caps) = RE_THIS.captures(code) {
        let value = classify_value(&code[caps[0].len()..])?;
        return Some(Construct::InstanceAssignment {
            owner: class.to_string(),
            member: caps[1].to_string(),
            value,
        });
    }
    match recognize_function(code)? {
        Construct::FunctionDeclaration { name, params, .. }
        | Construct::FunctionExpression { name, params, .. } => Some(Construct::InnerFunction {
            owner: class.to_string(),
            name,
            params,
        }),
        _ => None,
    }
}

/// Classify an assignment's right-hand side. `None` for `==`/`===` comparisons.
fn classify_value(rhs: &str) -> Option<AssignedValue> {
    if rhs.starts_with('=') {
        return None;
    }
    let rhs = rhs.trim_start();
    if let Some(caps) = RE_RHS_FUNC.captures(rhs) {
        let start = caps[0].len();
        let params = closing_paren(rhs, start)
            .map(|close| split_params(&rhs[start..close]))
            .unwrap_or_default();
        return Some(AssignedValue::Function { params });
    }
    if let Some(caps) = RE_RHS_REF.captures(rhs) {
        let name = &caps[1];
        if !LITERAL_WORDS.contains(&name) {
            return Some(AssignedValue::Reference(name.to_string()));
        }
    }
    Some(AssignedValue::Literal)
}

/// Parameter names from a parenthesized list; defaults are dropped.
fn split_params(list: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut from = 0;
    let commas = top_level(list)
        .filter(|&(_, c)| c == ',')
        .map(|(i, _)| i)
        .chain(std::iter::once(list.len()));
    for to in commas {
        let name = list[from..to].split('=').next().unwrap_or("").trim();
        if !name.is_empty() {
            names.push(name.to_string());
        }
        from = to + 1;
    }
    names
}

/// Index of the `)` that closes a list opened just before `start`.
fn closing_paren(code: &str, start: usize) -> Option<usize> {
    top_level(&code[start..])
        .find(|&(_, c)| matches!(c, ')' | ']' | '}'))
        .filter(|&(_, c)| c == ')')
        .map(|(i, _)| start + i)
}

/// Characters outside string literals and bracket pairs. Unmatched closing
/// brackets are yielded.
fn top_level(text: &str) -> impl Iterator<Item = (usize, char)> + '_ {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    text.char_indices().filter(move |&(_, c)| {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            return false;
        }
        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                false
            }
            '(' | '[' | '{' => {
                depth += 1;
                false
            }
            ')' | ']' | '}' if depth > 0 => {
                depth -= 1;
                false
            }
            _ => depth == 0,
        }
    })
}
