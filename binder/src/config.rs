//! Code for reading app configuration from a TOML file.
//! Every setting has a default, so running without a configuration file builds the book from `docs/` into `tmp/`.

use crate::{compose::Slot, convert::Converter, patch::PatchRules};
use anyhow::{anyhow, Context, Result};
use common::read_text;
use same_file::is_same_file;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use toml_edit::de::from_str as toml_from_str;
use tracing::debug;

/// Configuration file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "book.toml";

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    // Directory holding the Markdown sources, the manifest and the figures directory
    pub docs_dir: Box<Path>,
    // Directory for normalized sources and converter output
    pub scratch_dir: Box<Path>,
    // Manifest path, relative to `docs_dir`
    pub manifest: Box<Path>,
    // Source file converted ahead of every manifest chapter
    pub front_file: Box<str>,
    // Part caption the front file is filed under
    pub front_caption: Box<str>,
    // Figures directory name, copied from `docs_dir` into `scratch_dir`
    pub figures_dir: Box<Path>,
    // Name of the assembled document inside the exports directory
    pub output_file: Box<Path>,
    // Replacement for the built-in LaTeX template
    pub template_file: Option<Box<Path>>,
    pub on_converter_failure: FailurePolicy,
    // Which template slot each part caption is inserted into
    pub parts: Box<[PartSlot]>,
    pub converter: Converter,
    pub patch: PatchRules,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartSlot {
    pub caption: Box<str>,
    pub slot: Slot,
}

/// What to do when the converter fails on a chapter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop assembling the book
    #[default]
    Abort,
    /// Leave the chapter out of the book
    Skip,
    /// Read the expected output file anyway
    Continue,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            docs_dir: Path::new("docs").into(),
            scratch_dir: Path::new("tmp").into(),
            manifest: Path::new("_toc.yml").into(),
            front_file: "front-print".into(),
            front_caption: "Intro".into(),
            figures_dir: Path::new("figures").into(),
            output_file: Path::new("book-complete.tex").into(),
            template_file: None,
            on_converter_failure: FailurePolicy::default(),
            parts: [
                ("Intro", Slot::FrontMatter),
                ("Lessons", Slot::Content),
                ("Extras", Slot::BackMatter),
            ]
            .into_iter()
            .map(|(caption, slot)| PartSlot {
                caption: caption.into(),
                slot,
            })
            .collect(),
            converter: Converter::default(),
            patch: PatchRules::default(),
        }
    }
}

impl Config {
    /// Reads configuration from `path`, or from `book.toml` in the working directory if it exists.
    /// Otherwise, the defaults are used.
    ///
    /// # Errors
    /// This function returns an error if:
    /// - the configuration file cannot be read or parsed
    /// - `docs_dir` does not point to a directory
    /// - `scratch_dir` and `docs_dir` point to the same location
    /// - `template_file` is set but does not point to a file
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_path(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_path(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                debug!("no configuration file found; using defaults");
                Self::default()
            }
        };

        config
            .check_paths()
            .context("configuration file is invalid")?;

        Ok(config)
    }

    /// Parses a configuration file without checking the paths it names.
    ///
    /// # Errors
    /// This function returns an error if the file cannot be read or is not valid configuration.
    pub fn from_path(path: &Path) -> Result<Self> {
        toml_from_str(&read_text(path).context("failed to read configuration")?)
            .with_context(|| format!("failed to parse configuration file {path:?}"))
    }

    fn check_paths(&self) -> Result<()> {
        if !self.docs_dir.is_dir() {
            return Err(anyhow!(
                "`docs_dir`: {:?} does not point to a directory",
                self.docs_dir
            ));
        }

        if self.scratch_dir.exists()
            && is_same_file(&self.scratch_dir, &self.docs_dir)
                .context("failed to compare `scratch_dir` and `docs_dir`")?
        {
            return Err(anyhow!(
                "`scratch_dir` and `docs_dir` point to the same location"
            ));
        }

        match &self.template_file {
            Some(path) if !path.is_file() => Err(anyhow!(
                "`template_file`: {path:?} does not point to a file"
            )),
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.docs_dir.join(&self.manifest)
    }

    #[must_use]
    pub fn source_path(&self, file: &str) -> PathBuf {
        self.docs_dir.join(format!("{file}.md"))
    }

    #[must_use]
    pub fn scratch_path(&self, file: &str) -> PathBuf {
        self.scratch_dir.join(format!("{file}.md"))
    }

    #[must_use]
    pub fn exports_dir(&self) -> PathBuf {
        self.scratch_dir.join(&*self.converter.exports_dir_name)
    }

    /// Where the converter leaves the LaTeX for the chapter `file`.
    #[must_use]
    pub fn converted_path(&self, file: &str) -> PathBuf {
        self.converter.output_path(&self.scratch_dir, file)
    }

    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.exports_dir().join(&self.output_file)
    }

    /// Caption-to-slot pairs in configuration order.
    #[must_use]
    pub fn slots(&self) -> Vec<(Box<str>, Slot)> {
        self.parts
            .iter()
            .map(|part| (part.caption.clone(), part.slot))
            .collect()
    }
}
