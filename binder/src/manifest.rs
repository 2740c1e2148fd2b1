//! Code for reading the book's table of contents from a YAML file.

use anyhow::{Context, Result};
use common::read_text;
use serde::Deserialize;
use std::path::Path;

#[cfg_attr(test, derive(PartialEq))]
#[derive(Debug, Deserialize)]
pub struct Manifest {
    pub parts: Box<[Part]>,
}

#[cfg_attr(test, derive(PartialEq))]
#[derive(Debug, Deserialize)]
pub struct Part {
    pub caption: Box<str>,
    pub chapters: Box<[Chapter]>,
}

#[cfg_attr(test, derive(PartialEq))]
#[derive(Debug, Deserialize)]
pub struct Chapter {
    // Source file name relative to the docs directory, without the `.md` extension
    pub file: Box<str>,
}

impl Manifest {
    /// Reads and parses a manifest file.
    ///
    /// # Errors
    /// This function returns an error if the file cannot be read or does not have the expected structure.
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_yaml(&read_text(path)?)
            .with_context(|| format!("failed to parse manifest at {path:?}"))
    }

    /// Parses a manifest from YAML text. Keys other than `parts`, `caption`, `chapters` and `file` are ignored.
    ///
    /// # Errors
    /// This function returns an error if the text is not valid YAML or is missing required fields.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("manifest does not match the expected structure")
    }

    /// Iterates over `(caption, file)` pairs in processing order.
    pub fn chapters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parts.iter().flat_map(|part| {
            part.chapters
                .iter()
                .map(|chapter| (&*part.caption, &*chapter.file))
        })
    }
}
