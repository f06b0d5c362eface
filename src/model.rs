//! Data model for extracted documentation: format-agnostic.
//!
//! Everything here is produced by the parser pipeline and handed to
//! renderers as a read-only [`DocletModel`].

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

// -- Source positions ---------------------------------------------------------

/// A contiguous range of source text. Offsets are byte offsets, lines are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
    pub start_line: usize,
    pub end_line: usize,
}

impl SourceSpan {
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Slice the text this span was produced from.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Where a symbol or diagnostic came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
}

// -- Comments -----------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommentKind {
    /// `/** ... */`
    Doc,
    /// `/* ... */`
    Block,
    /// `// ...`
    Line,
}

/// A comment span together with its inner text (delimiters removed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentBlock {
    pub kind: CommentKind,
    pub span: SourceSpan,
    pub text: String,
    /// False for a block comment that runs into end of input.
    pub terminated: bool,
}

// -- Parsed doc comments ------------------------------------------------------

/// Canonical meaning of a tag, after synonyms are folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Param,
    Returns,
    See,
    Throws,
    Constructor,
    Extends,
    Private,
    Deprecated,
    Author,
    Version,
    Since,
    Type,
    FileOverview,
    Other,
}

impl TagKind {
    /// Tag names are case-sensitive: `@Param` is an unknown tag.
    pub fn from_name(name: &str) -> Self {
        match name {
            "param" | "argument" | "arg" => TagKind::Param,
            "returns" | "return" => TagKind::Returns,
            "see" => TagKind::See,
            "throws" | "exception" => TagKind::Throws,
            "constructor" | "class" => TagKind::Constructor,
            "extends" | "augments" => TagKind::Extends,
            "private" => TagKind::Private,
            "deprecated" => TagKind::Deprecated,
            "author" => TagKind::Author,
            "version" => TagKind::Version,
            "since" => TagKind::Since,
            "type" => TagKind::Type,
            "fileoverview" | "overview" | "file" => TagKind::FileOverview,
            _ => TagKind::Other,
        }
    }
}

/// An inline `{@link Target label}` occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineLink {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// One `@tag` occurrence inside a doc comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clause {
    /// Tag name exactly as written, e.g. `argument`.
    pub tag: String,
    /// Parameter name for `@param` and its synonyms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Leading `{Type}` expression, braces removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_expr: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<InlineLink>,
    /// Line of the `@tag` within the source file.
    pub line: usize,
}

impl Clause {
    pub fn kind(&self) -> TagKind {
        TagKind::from_name(&self.tag)
    }
}

/// The parsed content of a single doc comment, before it is attached to code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Doclet {
    pub description: String,
    /// `{@link}` references found in the description.
    pub links: Vec<InlineLink>,
    pub clauses: Vec<Clause>,
}

impl Doclet {
    pub fn clauses_of(&self, kind: TagKind) -> impl Iterator<Item = &Clause> {
        self.clauses.iter().filter(move |c| c.kind() == kind)
    }

    pub fn first_of(&self, kind: TagKind) -> Option<&Clause> {
        self.clauses_of(kind).next()
    }

    pub fn is_constructor(&self) -> bool {
        self.first_of(TagKind::Constructor).is_some()
    }
}

// -- Constructs ---------------------------------------------------------------

/// Right-hand side of a recognized assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignedValue {
    /// `= function (a, b) { ... }`
    Function { params: Vec<String> },
    /// `= SomeFunction`, resolved later by the linker.
    Reference(String),
    /// Anything else: `= 0`, `= null`, `= { ... }`.
    Literal,
}

/// A documentable code shape recognized right after a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Construct {
    /// `function Name(params) { ... }`
    FunctionDeclaration {
        name: String,
        params: Vec<String>,
        /// Offset of the body's `{`, relative to the construct start.
        body_open: usize,
    },
    /// `var Name = function(params) { ... }`
    FunctionExpression {
        name: String,
        params: Vec<String>,
        body_open: usize,
    },
    /// `Owner.prototype.member = value`
    PropertyAssignment {
        owner: String,
        member: String,
        value: AssignedValue,
    },
    /// `Owner.prototype = new Base(...)`
    PrototypeReplacement { class: String, base: String },
    /// `Owner.member = value`
    StaticAssignment {
        owner: String,
        member: String,
        value: AssignedValue,
    },
    /// `this.member = value` inside a constructor body.
    InstanceAssignment {
        owner: String,
        member: String,
        value: AssignedValue,
    },
    /// `function name() {}` nested inside a constructor body.
    InnerFunction {
        owner: String,
        name: String,
        params: Vec<String>,
    },
}

impl Construct {
    /// The owning identifier path, e.g. `Rectangle.prototype.getWidth`.
    pub fn path(&self) -> String {
        match self {
            Construct::FunctionDeclaration { name, .. }
            | Construct::FunctionExpression { name, .. } => name.clone(),
            Construct::PropertyAssignment { owner, member, .. } => {
                format!("{owner}.prototype.{member}")
            }
            Construct::PrototypeReplacement { class, .. } => format!("{class}.prototype"),
            Construct::StaticAssignment { owner, member, .. } => format!("{owner}.{member}"),
            Construct::InstanceAssignment { member, .. } => format!("this.{member}"),
            Construct::InnerFunction { owner, name, .. } => format!("{owner}~{name}"),
        }
    }
}

// -- Symbols ------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Constructor,
    InstanceMethod,
    InstanceProperty,
    StaticMethod,
    StaticProperty,
    FreeFunction,
    PrivateInner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Constructor => "constructor",
            Role::InstanceMethod => "instance-method",
            Role::InstanceProperty => "instance-property",
            Role::StaticMethod => "static-method",
            Role::StaticProperty => "static-property",
            Role::FreeFunction => "free-function",
            Role::PrivateInner => "private-inner",
        }
    }
}

/// Progress of one name-based edge through the linker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "target", rename_all = "kebab-case")]
pub enum LinkState {
    Unresolved,
    Resolving,
    /// Resolved to this qualified name.
    Resolved(String),
    Dangling,
}

impl LinkState {
    pub fn resolved(&self) -> Option<&str> {
        match self {
            LinkState::Resolved(name) => Some(name),
            _ => None,
        }
    }
}

/// A name reference (`@see`, `{@link}`, base class, implementation function).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    /// The name as written in the source.
    pub name: String,
    pub link: LinkState,
}

impl Reference {
    pub fn unresolved(name: impl Into<String>) -> Self {
        Reference {
            name: name.into(),
            link: LinkState::Unresolved,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_expr: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypedDescription {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_expr: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeeAlso {
    pub target: Reference,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Extra state carried by constructor symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassInfo {
    /// Name edge to the base class; never an ownership edge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<Reference>,
    /// Qualified names of members, in source order.
    pub members: Vec<String>,
}

/// One finished documentation unit: a class, a member, or a free function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub name: String,
    pub short_name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub description: String,
    pub params: Vec<Param>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns: Option<TypedDescription>,
    pub see: Vec<SeeAlso>,
    pub throws: Vec<TypedDescription>,
    pub links: Vec<Reference>,
    pub is_constructor: bool,
    pub private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_expr: Option<String>,
    /// Parameter names as declared in code (not validated against `params`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub signature: Vec<String>,
    /// Tags with no dedicated field, kept verbatim.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Clause>,
    /// Function whose doclet backs an indirect assignment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<ClassInfo>,
    /// False when the symbol has no comment of its own.
    pub documented: bool,
    pub location: Location,
    /// (file index, byte offset), the source order across a project.
    #[serde(skip)]
    pub(crate) order: (usize, usize),
}

impl Symbol {
    pub fn new(name: impl Into<String>, role: Role, location: Location) -> Self {
        let name = name.into();
        let short_name = short_name_of(&name).to_string();
        Symbol {
            name,
            short_name,
            role,
            owner: None,
            description: String::new(),
            params: Vec::new(),
            returns: None,
            see: Vec::new(),
            throws: Vec::new(),
            links: Vec::new(),
            is_constructor: role == Role::Constructor,
            private: role == Role::PrivateInner,
            deprecated: None,
            authors: Vec::new(),
            version: None,
            since: None,
            type_expr: None,
            signature: Vec::new(),
            tags: Vec::new(),
            implementation: None,
            class: None,
            documented: false,
            location,
            order: (0, 0),
        }
    }

    /// True when no doc content was attached, own or borrowed.
    pub fn is_empty_doclet(&self) -> bool {
        self.description.is_empty()
            && self.params.is_empty()
            && self.returns.is_none()
            && self.see.is_empty()
            && self.throws.is_empty()
    }

    pub fn base_class(&self) -> Option<&Reference> {
        self.class.as_ref().and_then(|c| c.base.as_ref())
    }
}

/// Last segment of a qualified name: `Shape#getColor` → `getColor`.
pub fn short_name_of(name: &str) -> &str {
    name.rsplit(['.', '#', '~']).next().unwrap_or(name)
}

// -- Diagnostics --------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    MalformedComment,
    UnrecognizedConstruct,
    DuplicateSymbol,
    DanglingReference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// A non-fatal problem found while parsing or linking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub location: Location,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, location: Location, message: impl Into<String>) -> Self {
        let severity = match kind {
            DiagnosticKind::UnrecognizedConstruct => Severity::Info,
            _ => Severity::Warning,
        };
        Diagnostic {
            kind,
            severity,
            location,
            message: message.into(),
        }
    }
}

// -- Unattached comments ------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnattachedReason {
    /// Followed by another doc comment or end of input.
    NoConstruct,
    /// The following code matched no pattern.
    Unrecognized,
    /// Nested in a scope that is not a constructor body.
    NestedScope,
    /// Recognized, but the construct does not produce a symbol.
    NoSymbol,
    /// Unterminated block comment.
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnattachedComment {
    pub location: Location,
    pub text: String,
    pub reason: UnattachedReason,
}

/// Per-file metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
}

// -- The finished model -------------------------------------------------------

/// The sole exported artifact of a parse run. Immutable once built.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocletModel {
    pub(crate) files: Vec<FileInfo>,
    pub(crate) symbols: BTreeMap<String, Symbol>,
    pub(crate) free_functions: Vec<String>,
    pub(crate) unattached: Vec<UnattachedComment>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl DocletModel {
    pub fn files(&self) -> &[FileInfo] {
        &self.files
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// All symbols, ordered by qualified name.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Names of documented functions not bound to any class, in source order.
    pub fn free_functions(&self) -> &[String] {
        &self.free_functions
    }

    pub fn unattached(&self) -> &[UnattachedComment] {
        &self.unattached
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_warnings(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Warning)
    }

    /// Classes (constructor symbols) in source order.
    pub fn classes(&self) -> Vec<&Symbol> {
        let mut classes: Vec<&Symbol> = self
            .symbols
            .values()
            .filter(|s| s.role == Role::Constructor)
            .collect();
        classes.sort_by_key(|s| s.order);
        classes
    }

    /// Member symbols of a class, in source order.
    pub fn members_of(&self, class: &str) -> Vec<&Symbol> {
        self.get(class)
            .and_then(|s| s.class.as_ref())
            .map(|info| info.members.iter().filter_map(|m| self.get(m)).collect())
            .unwrap_or_default()
    }

    /// Resolved base classes, nearest first. Stops at a dangling base or a cycle.
    pub fn ancestors(&self, class: &str) -> Vec<&Symbol> {
        let mut chain = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(class);
        let mut current = self.get(class);
        while let Some(base) = current
            .and_then(Symbol::base_class)
            .and_then(|r| r.link.resolved())
        {
            if !seen.insert(base) {
                break;
            }
            match self.get(base) {
                Some(sym) => {
                    chain.push(sym);
                    current = Some(sym);
                }
                None => break,
            }
        }
        chain
    }

    /// Keep only symbols accepted by `keep`; member and free-function lists follow.
    pub fn retain(&mut self, mut keep: impl FnMut(&Symbol) -> bool) {
        self.symbols.retain(|_, s| keep(s));
        let symbols = &self.symbols;
        self.free_functions.retain(|n| symbols.contains_key(n));
        let names: HashSet<String> = symbols.keys().cloned().collect();
        for sym in self.symbols.values_mut() {
            if let Some(info) = sym.class.as_mut() {
                info.members.retain(|m| names.contains(m));
            }
        }
    }
}
