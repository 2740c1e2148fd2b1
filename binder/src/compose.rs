//! Code for combining converted chapters into one LaTeX document.

use crate::patch::{patch, BlockState, PatchRules};
use anyhow::{bail, Context, Result};
use foldhash::{HashMap, HashMapExt};
use serde::Deserialize;
use std::{fs, path::Path};
use tracing::warn;
use walkdir::WalkDir;

/// The built-in book template.
pub const TEMPLATE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/book.tex"));

/// An insertion point in the document template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Slot {
    #[serde(alias = "frontmatter")]
    FrontMatter,
    Content,
    #[serde(alias = "backmatter")]
    BackMatter,
}

impl Slot {
    pub const ALL: [Self; 3] = [Self::FrontMatter, Self::Content, Self::BackMatter];

    #[must_use]
    pub const fn placeholder(self) -> &'static str {
        match self {
            Self::FrontMatter => "[-FRONTMATTER-]",
            Self::Content => "[-CONTENT-]",
            Self::BackMatter => "[-BACKMATTER-]",
        }
    }
}

/// Checks that a template contains every slot's placeholder exactly once.
///
/// # Errors
/// This function returns an error naming the first placeholder that is missing or repeated.
pub fn validate_template(template: &str) -> Result<()> {
    for slot in Slot::ALL {
        match template.matches(slot.placeholder()).count() {
            1 => {}
            0 => bail!("template is missing the placeholder {}", slot.placeholder()),
            n => bail!(
                "template contains the placeholder {} {n} times",
                slot.placeholder()
            ),
        }
    }
    Ok(())
}

/// Converted chapter text, accumulated per part caption.
#[derive(Debug, Default)]
pub struct BookParts {
    buffers: HashMap<Box<str>, String>,
}

impl BookParts {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffers: HashMap::new(),
        }
    }

    /// Appends a chapter to the buffer for `caption`, starting it on a new line.
    pub fn append(&mut self, caption: &str, fragment: &str) {
        let buffer = self.buffers.entry(caption.into()).or_default();
        if !buffer.is_empty() && !buffer.ends_with('\n') {
            buffer.push('\n');
        }
        buffer.push_str(fragment);
    }

    /// Removes and returns the buffer for `caption`.
    pub fn take(&mut self, caption: &str) -> Option<String> {
        self.buffers.remove(caption)
    }

    pub fn captions(&self) -> impl Iterator<Item = &str> {
        self.buffers.keys().map(|caption| &**caption)
    }
}

/// Patches every slot's text and substitutes it into the template.
/// `slots` maps part captions to slots; parts sharing a slot are joined in mapping order.
/// Parts with no mapping are left out of the document.
#[must_use]
pub fn compose(
    template: &str,
    mut parts: BookParts,
    slots: &[(Box<str>, Slot)],
    rules: &PatchRules,
) -> String {
    let contents = Slot::ALL.map(|slot| {
        let mut text = String::new();
        for (caption, _) in slots.iter().filter(|(_, s)| *s == slot) {
            if let Some(buffer) = parts.take(caption) {
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
                text.push_str(&buffer);
            }
        }

        let patched = patch(&text, rules);
        if patched.state == BlockState::Code {
            warn!(
                placeholder = slot.placeholder(),
                "a verbatim block is never closed; the rest of this part was treated as code"
            );
        }
        patched.text
    });

    for caption in parts.captions() {
        warn!(caption, "part is not mapped to any slot and was left out");
    }

    fill_template(template, &contents)
}

// Placeholders are located in the template alone; inserted text is never searched
fn fill_template(template: &str, contents: &[String; 3]) -> String {
    let mut positions = Slot::ALL
        .iter()
        .zip(contents)
        .filter_map(|(slot, text)| {
            template
                .find(slot.placeholder())
                .map(|start| (start, slot.placeholder().len(), text))
        })
        .collect::<Vec<_>>();
    positions.sort_unstable_by_key(|(start, ..)| *start);

    let mut document =
        String::with_capacity(template.len() + contents.iter().map(String::len).sum::<usize>());
    let mut cursor = 0;
    for (start, len, text) in positions {
        document.push_str(&template[cursor..start]);
        document.push_str(text);
        cursor = start + len;
    }
    document.push_str(&template[cursor..]);

    document
}

/// Recursively copies a directory, overwriting files that already exist at the destination.
///
/// # Errors
/// This function returns an error if the source cannot be walked or a file cannot be copied.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.with_context(|| format!("failed to read entry in {src:?}"))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .context("directory entry should be inside the source directory")?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("failed to create directory at {target:?}"))?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!("failed to copy {:?} to {target:?}", entry.path())
            })?;
        }
    }
    Ok(())
}
