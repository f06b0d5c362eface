//! Extraction pipeline: scanner → recognizer → tags → builder → linker.
//!
//! Per-file stages run independently (in parallel for projects); the linker
//! runs once over the merged output.

pub mod builder;
pub mod linker;
pub mod recognizer;
pub mod scanner;
pub mod tags;

use crate::error::{Error, Result};
use crate::model::DocletModel;
use builder::FileDoclets;
use rayon::prelude::*;
use scanner::{Outline, Span};
use std::collections::HashSet;

/// One named input text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub text: String,
}

impl Source {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Source {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Run every per-file stage over one text. `index` orders files in the project.
pub fn parse_file(index: usize, name: &str, text: &str) -> FileDoclets {
    let spans: Vec<Span> = scanner::scan(text).collect();
    let outline = Outline::build(text, &spans);
    let out = builder::build(index, name, text, &spans, &outline);
    tracing::debug!(
        file = name,
        spans = spans.len(),
        symbols = out.symbols.len(),
        unattached = out.unattached.len(),
        "parsed source"
    );
    out
}

/// Extract the doclet model of a single source text.
pub fn parse_source(name: &str, text: &str) -> Result<DocletModel> {
    parse_project(&[Source::new(name, text)])
}

/// Extract one doclet model from several source texts.
///
/// Files are parsed in parallel; linking starts once every file is done.
/// Input order decides source order and last-write-wins on name collisions.
pub fn parse_project(sources: &[Source]) -> Result<DocletModel> {
    validate(sources)?;

    let files: Vec<FileDoclets> = sources
        .par_iter()
        .enumerate()
        .map(|(index, source)| parse_file(index, &source.name, &source.text))
        .collect();

    Ok(linker::link(files))
}

fn validate(sources: &[Source]) -> Result<()> {
    let mut seen = HashSet::new();
    for source in sources {
        if source.name.is_empty() {
            return Err(Error::InvalidInput("source name is empty".to_string()));
        }
        if !seen.insert(source.name.as_str()) {
            return Err(Error::InvalidInput(format!(
                "source `{}` given more than once",
                source.name
            )));
        }
        if source.text.contains('\0') {
            return Err(Error::InvalidInput(format!(
                "source `{}` contains NUL bytes and does not look like text",
                source.name
            )));
        }
    }
    Ok(())
}
