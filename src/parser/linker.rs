//! Linker: merges per-file output and resolves name-based edges.
//!
//! Resolution is a single pass over a frozen snapshot of the symbol table:
//! every edge is looked up once (`Unresolved → Resolving → Resolved |
//! Dangling`) and the results are applied afterwards, so the pass always
//! terminates and never chains inferences.

use crate::model::*;
use crate::parser::builder::{FileDoclets, Inheritance};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Merge every file's provisional output and link it into the final model.
///
/// Callers must hand over all files at once; linking starts only after
/// every per-file parse has completed.
pub fn link(files: Vec<FileDoclets>) -> DocletModel {
    let mut model = DocletModel::default();
    let mut table: BTreeMap<String, Symbol> = BTreeMap::new();
    let mut inheritance: Vec<Inheritance> = Vec::new();

    for file in files {
        model.files.push(file.file);
        model.unattached.extend(file.unattached);
        model.diagnostics.extend(file.diagnostics);
        inheritance.extend(file.inheritance);
        for sym in file.symbols {
            insert_symbol(&mut table, sym, &mut model.diagnostics);
        }
    }

    promote_classes(&mut table, &inheritance);

    let resolved = resolve(&table, &inheritance);
    apply(&mut table, resolved, &mut model.diagnostics);

    check_owners(&table, &mut model.diagnostics);
    collect_members(&mut table);
    resolve_references(&mut table, &mut model.diagnostics);

    let mut free: Vec<&Symbol> = table
        .values()
        .filter(|s| s.role == Role::FreeFunction)
        .collect();
    free.sort_by_key(|s| s.order);
    model.free_functions = free.into_iter().map(|s| s.name.clone()).collect();

    tracing::debug!(
        symbols = table.len(),
        free_functions = model.free_functions.len(),
        diagnostics = model.diagnostics.len(),
        "linked doclet model"
    );
    model.symbols = table;
    model
}

/// Insert with last-write-wins semantics. Names carry the member slot
/// (`#` instance, `.` static, `~` inner), so only a redefinition of the same
/// slot collides.
fn insert_symbol(table: &mut BTreeMap<String, Symbol>, sym: Symbol, diags: &mut Vec<Diagnostic>) {
    let location = sym.location.clone();
    let name = sym.name.clone();
    let role = sym.role;
    if let Some(previous) = table.insert(name.clone(), sym) {
        let message = if previous.role == role {
            format!(
                "`{name}` is documented again; this definition replaces the one at {}:{}",
                previous.location.file, previous.location.line
            )
        } else {
            format!(
                "`{name}` ({}) replaces a {} of the same name at {}:{}",
                role.as_str(),
                previous.role.as_str(),
                previous.location.file,
                previous.location.line
            )
        };
        diags.push(Diagnostic::new(DiagnosticKind::DuplicateSymbol, location, message));
    }
}

/// Functions owning prototype members (or a replaced prototype) are classes,
/// whether or not they carry `@constructor`.
fn promote_classes(table: &mut BTreeMap<String, Symbol>, inheritance: &[Inheritance]) {
    let owners: HashSet<String> = table
        .values()
        .filter(|s| matches!(s.role, Role::InstanceMethod | Role::InstanceProperty))
        .filter_map(|s| s.owner.clone())
        .chain(inheritance.iter().map(|e| e.class.clone()))
        .collect();

    for owner in owners {
        if let Some(sym) = table.get_mut(&owner) {
            if sym.role == Role::FreeFunction {
                sym.role = Role::Constructor;
            }
        }
    }
    for sym in table.values_mut() {
        if sym.role == Role::Constructor && sym.class.is_none() {
            sym.class = Some(ClassInfo::default());
        }
    }
}

/// One name-based edge on its way through resolution.
#[derive(Debug)]
struct Edge {
    /// Qualified name of the symbol the edge starts from.
    from: String,
    to: String,
    state: LinkState,
    location: Location,
}

impl Edge {
    fn new(from: &str, to: &str, location: &Location) -> Self {
        Edge {
            from: from.to_string(),
            to: to.to_string(),
            state: LinkState::Unresolved,
            location: location.clone(),
        }
    }

    fn resolve(&mut self, found: impl FnOnce(&str) -> bool) {
        debug_assert_eq!(self.state, LinkState::Unresolved);
        self.state = LinkState::Resolving;
        self.state = if found(&self.to) {
            LinkState::Resolved(self.to.clone())
        } else {
            LinkState::Dangling
        };
    }
}

struct Resolved {
    implementations: Vec<Edge>,
    bases: Vec<Edge>,
}

/// Look every edge up against the frozen table. Nothing is mutated here.
fn resolve(table: &BTreeMap<String, Symbol>, inheritance: &[Inheritance]) -> Resolved {
    let mut implementations = Vec::new();
    for sym in table.values() {
        let Some(target) = sym.implementation.as_ref() else {
            continue;
        };
        let mut edge = Edge::new(&sym.name, &target.name, &sym.location);
        edge.resolve(|name| {
            table
                .get(name)
                .is_some_and(|f| f.role == Role::FreeFunction)
        });
        implementations.push(edge);
    }

    let mut bases = Vec::new();
    for inh in inheritance {
        let mut edge = Edge::new(&inh.class, &inh.base, &inh.location);
        edge.resolve(|name| {
            table
                .get(name)
                .is_some_and(|b| b.role == Role::Constructor)
        });
        bases.push(edge);
    }

    Resolved {
        implementations,
        bases,
    }
}

fn apply(table: &mut BTreeMap<String, Symbol>, resolved: Resolved, diags: &mut Vec<Diagnostic>) {
    // Clone implementation sources first; several members may share one.
    let sources: HashMap<String, Symbol> = resolved
        .implementations
        .iter()
        .filter_map(|e| e.state.resolved())
        .filter_map(|name| table.get(name).map(|s| (name.to_string(), s.clone())))
        .collect();

    for edge in resolved.implementations {
        let Some(member) = table.get_mut(&edge.from) else {
            continue;
        };
        match &edge.state {
            LinkState::Resolved(name) => {
                if let Some(source) = sources.get(name) {
                    borrow_doclet(member, source);
                }
            }
            _ => {
                diags.push(Diagnostic::new(
                    DiagnosticKind::DanglingReference,
                    edge.location.clone(),
                    format!(
                        "`{}` is assigned `{}`, which is not a documented function",
                        edge.from, edge.to
                    ),
                ));
            }
        }
        member.implementation = Some(Reference {
            name: edge.to,
            link: edge.state,
        });
    }

    // Consumed implementations are not free functions any more.
    for name in sources.keys() {
        table.remove(name);
    }

    for edge in resolved.bases {
        let Some(info) = table.get_mut(&edge.from).and_then(|c| c.class.as_mut()) else {
            diags.push(Diagnostic::new(
                DiagnosticKind::DanglingReference,
                edge.location.clone(),
                format!("`{}` inherits from `{}` but is not a documented class", edge.from, edge.to),
            ));
            continue;
        };
        if edge.state == LinkState::Dangling {
            diags.push(Diagnostic::new(
                DiagnosticKind::DanglingReference,
                edge.location.clone(),
                format!("base class `{}` of `{}` is not documented", edge.to, edge.from),
            ));
        }
        info.base = Some(Reference {
            name: edge.to,
            link: edge.state,
        });
    }
}

/// Fill gaps in a member's own doc content from its implementation function.
fn borrow_doclet(member: &mut Symbol, source: &Symbol) {
    if member.description.is_empty() {
        member.description = source.description.clone();
    }
    if member.params.is_empty() {
        member.params = source.params.clone();
    }
    if member.returns.is_none() {
        member.returns = source.returns.clone();
    }
    if member.see.is_empty() {
        member.see = source.see.clone();
    }
    if member.throws.is_empty() {
        member.throws = source.throws.clone();
    }
    if member.deprecated.is_none() {
        member.deprecated = source.deprecated.clone();
    }
    if member.signature.is_empty() {
        member.signature = source.signature.clone();
    }
    member.private |= source.private;
    member.links.extend(source.links.iter().cloned());
    member.authors.extend(source.authors.iter().cloned());
    member.tags.extend(source.tags.iter().cloned());
}

fn check_owners(table: &BTreeMap<String, Symbol>, diags: &mut Vec<Diagnostic>) {
    let mut reported: HashSet<&str> = HashSet::new();
    let mut members: Vec<&Symbol> = table.values().filter(|s| s.owner.is_some()).collect();
    members.sort_by_key(|s| s.order);
    for sym in members {
        let Some(owner) = sym.owner.as_deref() else {
            continue;
        };
        if !table.contains_key(owner) && reported.insert(owner) {
            diags.push(Diagnostic::new(
                DiagnosticKind::DanglingReference,
                sym.location.clone(),
                format!("owner `{owner}` of `{}` is not documented", sym.name),
            ));
        }
    }
}

/// Record each class's members in source order.
fn collect_members(table: &mut BTreeMap<String, Symbol>) {
    let mut members: Vec<(&str, &str, (usize, usize))> = table
        .values()
        .filter(|s| s.role != Role::PrivateInner)
        .filter_map(|s| s.owner.as_deref().map(|o| (o, s.name.as_str(), s.order)))
        .collect();
    members.sort_by_key(|m| m.2);

    let mut by_owner: HashMap<String, Vec<String>> = HashMap::new();
    for (owner, name, _) in members {
        by_owner
            .entry(owner.to_string())
            .or_default()
            .push(name.to_string());
    }

    for (owner, names) in by_owner {
        if let Some(info) = table.get_mut(&owner).and_then(|s| s.class.as_mut()) {
            info.members = names;
        }
    }
}

/// Resolve `@see` and `{@link}` targets against the final name table.
fn resolve_references(table: &mut BTreeMap<String, Symbol>, diags: &mut Vec<Diagnostic>) {
    let names: HashSet<String> = table.keys().cloned().collect();

    for sym in table.values_mut() {
        let context = match sym.role {
            Role::Constructor => Some(sym.name.clone()),
            _ => sym.owner.clone(),
        };
        let location = sym.location.clone();
        let refs = sym
            .see
            .iter_mut()
            .map(|s| &mut s.target)
            .chain(sym.links.iter_mut());
        for reference in refs {
            if !matches!(reference.link, LinkState::Unresolved) {
                continue;
            }
            reference.link = LinkState::Resolving;
            if reference.name.contains("://") {
                reference.link = LinkState::Dangling;
                continue;
            }
            let found = target_candidates(&reference.name, context.as_deref())
                .into_iter()
                .find(|candidate| names.contains(candidate));
            if let Some(name) = found {
                reference.link = LinkState::Resolved(name);
            } else {
                reference.link = LinkState::Dangling;
                diags.push(Diagnostic::new(
                    DiagnosticKind::DanglingReference,
                    location.clone(),
                    format!("reference `{}` does not name a documented symbol", reference.name),
                ));
            }
        }
    }
}

/// Qualified names a `@see`/`{@link}` target may mean, best first.
///
/// `#m` is an instance member of the context class (static as fallback),
/// `Class.prototype.m` is `Class#m`, and `Class.m` falls back to `Class#m`.
fn target_candidates(target: &str, context: Option<&str>) -> Vec<String> {
    let target = target.trim_end_matches("()");
    if let Some(member) = target.strip_prefix('#') {
        return match context {
            Some(class) => vec![format!("{class}#{member}"), format!("{class}.{member}")],
            None => vec![member.to_string()],
        };
    }
    if let Some((class, member)) = target.split_once(".prototype.") {
        return vec![format!("{class}#{member}")];
    }
    if target.contains(['#', '~']) {
        return vec![target.to_string()];
    }
    match target.rsplit_once('.') {
        Some((owner, member)) => vec![target.to_string(), format!("{owner}#{member}")],
        None => vec![target.to_string()],
    }
}
