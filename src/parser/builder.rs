//! Symbol builder: pairs doc comments with the construct that follows them.
//!
//! Produces the provisional, per-file output the linker consumes: symbols
//! in source order, inheritance edges, unattached comments, diagnostics.

use crate::model::*;
use crate::parser::recognizer::{self, Scope};
use crate::parser::scanner::{Outline, Span, SpanKind};
use crate::parser::tags;
use std::collections::HashSet;

/// A `Class → Base` edge, recorded by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inheritance {
    pub class: String,
    pub base: String,
    pub location: Location,
}

/// Everything one source file contributes before linking.
#[derive(Debug, Default)]
pub struct FileDoclets {
    pub file: FileInfo,
    pub symbols: Vec<Symbol>,
    pub inheritance: Vec<Inheritance>,
    pub unattached: Vec<UnattachedComment>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Build the provisional symbols of one file from its scanned spans.
pub fn build(
    index: usize,
    name: &str,
    source: &str,
    spans: &[Span],
    outline: &Outline,
) -> FileDoclets {
    let mut builder = Builder {
        index,
        name,
        source,
        spans,
        outline,
        line_starts: line_starts(source),
        constructors: Vec::new(),
        claimed: HashSet::new(),
        out: FileDoclets {
            file: FileInfo {
                name: name.to_string(),
                overview: None,
            },
            ..Default::default()
        },
    };

    for (i, span) in spans.iter().enumerate() {
        match span.kind {
            SpanKind::Comment(CommentKind::Doc) => builder.doc_comment(i, span),
            SpanKind::Comment(_) if !span.terminated => {
                builder.malformed(span);
            }
            _ => {}
        }
    }
    builder.sweep_undocumented();
    builder.out
}

struct Builder<'a> {
    index: usize,
    name: &'a str,
    source: &'a str,
    spans: &'a [Span],
    outline: &'a Outline,
    line_starts: Vec<usize>,
    /// (absolute offset of body `{`, class name) for `@constructor` functions.
    constructors: Vec<(usize, String)>,
    /// Construct offsets already paired with a doc comment.
    claimed: HashSet<usize>,
    out: FileDoclets,
}

impl Builder<'_> {
    fn location(&self, offset: usize) -> Location {
        Location {
            file: self.name.to_string(),
            line: self.line_starts.partition_point(|&s| s <= offset),
        }
    }

    fn malformed(&mut self, span: &Span) {
        let location = self.location(span.span.start);
        self.out.diagnostics.push(Diagnostic::new(
            DiagnosticKind::MalformedComment,
            location,
            "block comment is not terminated before end of input",
        ));
    }

    fn unattached(&mut self, comment: &CommentBlock, reason: UnattachedReason) {
        let location = self.location(comment.span.start);
        if matches!(
            reason,
            UnattachedReason::Unrecognized | UnattachedReason::NestedScope
        ) {
            let message = match reason {
                UnattachedReason::NestedScope => {
                    "doc comment inside a function that is not marked @constructor"
                }
                _ => "doc comment is not followed by a recognized declaration",
            };
            self.out.diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnrecognizedConstruct,
                location.clone(),
                message,
            ));
        }
        self.out.unattached.push(UnattachedComment {
            location,
            text: comment.text.trim().to_string(),
            reason,
        });
    }

    fn doc_comment(&mut self, i: usize, span: &Span) {
        let Some(comment) = span.comment(self.source) else {
            return;
        };
        if !span.terminated {
            self.malformed(span);
            self.unattached(&comment, UnattachedReason::Malformed);
            return;
        }

        let doclet = tags::parse(&comment.text, span.span.start_line);

        if let Some(overview) = doclet.first_of(TagKind::FileOverview) {
            let text = if overview.description.is_empty() {
                doclet.description.clone()
            } else {
                overview.description.clone()
            };
            self.out.file.overview.get_or_insert(text);
            return;
        }

        let Some(offset) = self.following_code(i) else {
            self.unattached(&comment, UnattachedReason::NoConstruct);
            return;
        };
        let Some(scope) = self.scope_of(span.span.start) else {
            self.unattached(&comment, UnattachedReason::NestedScope);
            return;
        };

        match recognizer::recognize(&self.source[offset..], scope) {
            Some(construct) => {
                tracing::trace!(file = self.name, path = %construct.path(), "recognized construct");
                self.claimed.insert(offset);
                if !self.attach(&doclet, construct, offset) {
                    self.unattached(&comment, UnattachedReason::NoSymbol);
                }
            }
            None => self.unattached(&comment, UnattachedReason::Unrecognized),
        }
    }

    /// Offset of the first code after span `i`, skipping whitespace and
    /// ordinary comments. `None` if another doc comment or end of input comes first.
    fn following_code(&self, i: usize) -> Option<usize> {
        for span in &self.spans[i + 1..] {
            match span.kind {
                SpanKind::Code => {
                    let text = span.text(self.source);
                    if let Some(skip) = text.find(|c: char| !c.is_whitespace()) {
                        return Some(span.span.start + skip);
                    }
                }
                SpanKind::Comment(CommentKind::Doc) => return None,
                SpanKind::Comment(_) => {}
            }
        }
        None
    }

    /// Scope of a comment at `offset`. Plain blocks (`if`, `for`, ...) are
    /// looked through up to the nearest function body; `None` when that body
    /// is not a `@constructor`.
    fn scope_of(&self, offset: usize) -> Option<Scope<'_>> {
        for open in self.outline.enclosing_blocks(offset) {
            if let Some((_, class)) = self.constructors.iter().find(|(body, _)| *body == open) {
                return Some(Scope::ConstructorBody(class.as_str()));
            }
            if opens_function_body(&self.source[..open]) {
                return None;
            }
        }
        Some(Scope::Global)
    }

    /// Turn a documented construct into symbols or edges.
    /// Returns false when the construct yields no symbol.
    fn attach(&mut self, doclet: &Doclet, construct: Construct, offset: usize) -> bool {
        let location = self.location(offset);
        match construct {
            Construct::FunctionDeclaration {
                name,
                params,
                body_open,
            }
            | Construct::FunctionExpression {
                name,
                params,
                body_open,
            } => {
                let role = if doclet.is_constructor() {
                    self.constructors.push((offset + body_open, name.clone()));
                    Role::Constructor
                } else {
                    Role::FreeFunction
                };
                let mut sym = Symbol::new(&name, role, location.clone());
                sym.signature = params;
                if role == Role::Constructor {
                    sym.class = Some(ClassInfo::default());
                }
                if let Some(extends) = doclet.first_of(TagKind::Extends) {
                    let base = extends
                        .type_expr
                        .clone()
                        .unwrap_or_else(|| first_word(&extends.description));
                    if !base.is_empty() {
                        self.out.inheritance.push(Inheritance {
                            class: name.clone(),
                            base,
                            location,
                        });
                    }
                }
                self.push(sym, Some(doclet), offset);
            }
            Construct::PropertyAssignment {
                owner,
                member,
                value,
            }
            | Construct::InstanceAssignment {
                owner,
                member,
                value,
            } => {
                let sym = member_symbol(&owner, &member, false, value, location);
                self.push(sym, Some(doclet), offset);
            }
            Construct::StaticAssignment {
                owner,
                member,
                value,
            } => {
                let sym = member_symbol(&owner, &member, true, value, location);
                self.push(sym, Some(doclet), offset);
            }
            Construct::InnerFunction {
                owner,
                name,
                params,
            } => {
                let mut sym = Symbol::new(format!("{owner}~{name}"), Role::PrivateInner, location);
                sym.owner = Some(owner);
                sym.signature = params;
                self.push(sym, Some(doclet), offset);
            }
            Construct::PrototypeReplacement { class, base } => {
                self.out.inheritance.push(Inheritance {
                    class,
                    base,
                    location,
                });
                return false;
            }
        }
        true
    }

    fn push(&mut self, mut sym: Symbol, doclet: Option<&Doclet>, offset: usize) {
        if let Some(doclet) = doclet {
            apply_doclet(&mut sym, doclet);
        }
        sym.order = (self.index, offset);
        self.out.symbols.push(sym);
    }

    /// Pick up undocumented statements the linker still needs: indirect
    /// member assignments and prototype replacements at the top level.
    fn sweep_undocumented(&mut self) {
        let source = self.source;
        let mut candidates = Vec::new();
        for span in self.spans.iter().filter(|s| s.is_code()) {
            let text = span.text(source);
            let line_heads = std::iter::once(0).chain(text.match_indices('\n').map(|(i, _)| i + 1));
            for head in line_heads {
                let rest = &text[head..];
                let indent = rest.len() - rest.trim_start_matches([' ', '\t']).len();
                let offset = span.span.start + head + indent;
                if offset < span.span.end
                    && !source[offset..].starts_with(['\n', '\r'])
                    && self.outline.depth_at(offset) == 0
                    && !self.claimed.contains(&offset)
                {
                    candidates.push(offset);
                }
            }
        }

        for offset in candidates {
            let Some(construct) = recognizer::recognize(&source[offset..], Scope::Global) else {
                continue;
            };
            let location = self.location(offset);
            match construct {
                Construct::PrototypeReplacement { class, base } => {
                    self.out.inheritance.push(Inheritance {
                        class,
                        base,
                        location,
                    });
                }
                Construct::PropertyAssignment {
                    owner,
                    member,
                    value: value @ AssignedValue::Reference(_),
                } => {
                    let sym = member_symbol(&owner, &member, false, value, location);
                    self.push(sym, None, offset);
                }
                Construct::StaticAssignment {
                    owner,
                    member,
                    value: value @ AssignedValue::Reference(_),
                } => {
                    let sym = member_symbol(&owner, &member, true, value, location);
                    self.push(sym, None, offset);
                }
                _ => {}
            }
        }
    }
}

/// A member symbol with its role derived from the assigned value. Instance
/// members are named `Owner#member`, static ones `Owner.member`.
fn member_symbol(
    owner: &str,
    member: &str,
    is_static: bool,
    value: AssignedValue,
    location: Location,
) -> Symbol {
    let role = match (&value, is_static) {
        (AssignedValue::Literal, false) => Role::InstanceProperty,
        (AssignedValue::Literal, true) => Role::StaticProperty,
        (_, false) => Role::InstanceMethod,
        (_, true) => Role::StaticMethod,
    };
    let separator = if is_static { '.' } else { '#' };
    let mut sym = Symbol::new(format!("{owner}{separator}{member}"), role, location);
    sym.owner = Some(owner.to_string());
    match value {
        AssignedValue::Function { params } => sym.signature = params,
        AssignedValue::Reference(target) => sym.implementation = Some(Reference::unresolved(target)),
        AssignedValue::Literal => {}
    }
    sym
}

/// Copy parsed doc content onto a symbol.
fn apply_doclet(sym: &mut Symbol, doclet: &Doclet) {
    sym.documented = true;
    sym.description = doclet.description.clone();
    sym.links
        .extend(doclet.links.iter().map(|l| Reference::unresolved(&l.target)));

    for clause in &doclet.clauses {
        match clause.kind() {
            TagKind::Param => sym.params.push(Param {
                name: clause.name.clone().unwrap_or_default(),
                type_expr: clause.type_expr.clone(),
                description: clause.description.clone(),
            }),
            TagKind::Returns => {
                sym.returns.get_or_insert(TypedDescription {
                    type_expr: clause.type_expr.clone(),
                    description: clause.description.clone(),
                });
            }
            TagKind::Throws => sym.throws.push(TypedDescription {
                type_expr: clause.type_expr.clone(),
                description: clause.description.clone(),
            }),
            TagKind::See => {
                let (target, description) = tags::see_target(clause);
                if !target.is_empty() {
                    sym.see.push(SeeAlso {
                        target: Reference::unresolved(target),
                        description,
                    });
                }
                continue;
            }
            TagKind::Constructor => sym.is_constructor = true,
            TagKind::Private => sym.private = true,
            TagKind::Deprecated => sym.deprecated = Some(clause.description.clone()),
            TagKind::Author => sym.authors.push(clause.description.clone()),
            TagKind::Version => sym.version = Some(clause.description.clone()),
            TagKind::Since => sym.since = Some(clause.description.clone()),
            TagKind::Type => sym.type_expr = clause.type_expr.clone(),
            TagKind::Extends | TagKind::FileOverview => {}
            TagKind::Other => sym.tags.push(clause.clone()),
        }
        sym.links
            .extend(clause.links.iter().map(|l| Reference::unresolved(&l.target)));
    }
}

/// Keywords whose `(...) {` opens a plain block rather than a function body.
const BLOCK_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "catch", "with"];

/// Whether the `{` that follows `head` opens a function body: an arrow, or a
/// parenthesized list preceded by `function` or a method name.
fn opens_function_body(head: &str) -> bool {
    let head = head.trim_end();
    if head.ends_with("=>") {
        return true;
    }
    let Some(list) = head.strip_suffix(')') else {
        return false;
    };
    let mut depth = 0usize;
    let mut open = None;
    for (i, c) in list.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' if depth == 0 => {
                open = Some(i);
                break;
            }
            '(' => depth -= 1,
            _ => {}
        }
    }
    let Some(open) = open else {
        return false;
    };
    let word = list[..open]
        .trim_end()
        .rsplit(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .next()
        .unwrap_or("");
    !word.is_empty() && !BLOCK_KEYWORDS.contains(&word)
}

fn first_word(text: &str) -> String {
    text.split_whitespace().next().unwrap_or("").to_string()
}

fn line_starts(source: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(source.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}
