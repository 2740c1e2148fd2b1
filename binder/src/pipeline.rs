//! The book assembly pipeline: normalize, convert and collect every chapter, then compose the document.

use crate::{
    compose::{compose, copy_dir_all, validate_template, BookParts, TEMPLATE},
    config::{Config, FailurePolicy},
    manifest::Manifest,
    normalize::{normalize, CitationState},
};
use anyhow::{Context, Result};
use common::{read_text, write_text};
use std::{fs::create_dir_all, iter::once, path::PathBuf};
use tracing::{info, warn};

/// Builds the complete book and returns the path of the written LaTeX document.
///
/// Chapters are processed one at a time: the front file first, then every manifest chapter in order.
///
/// # Errors
/// This function returns an error if:
/// - the scratch directories cannot be created
/// - the figures directory cannot be copied
/// - the manifest or the template cannot be read, or the template lacks a placeholder
/// - a chapter source cannot be read, or its normalized copy cannot be written
/// - the converter cannot be started
/// - a conversion fails and the failure policy is `abort`, or its output cannot be read
/// - the document cannot be written
pub fn assemble(config: &Config) -> Result<PathBuf> {
    let exports_dir = config.exports_dir();
    create_dir_all(&exports_dir)
        .with_context(|| format!("failed to create exports directory at {exports_dir:?}"))?;

    copy_dir_all(
        &config.docs_dir.join(&config.figures_dir),
        &config.scratch_dir.join(&config.figures_dir),
    )
    .context("failed to copy figures into the scratch directory")?;

    let manifest = Manifest::from_path(&config.manifest_path())?;

    let template = match &config.template_file {
        Some(path) => read_text(path).context("failed to read template file")?,
        None => TEMPLATE.to_owned(),
    };
    validate_template(&template)?;

    let mut parts = BookParts::new();
    let chapters = once((&*config.front_caption, &*config.front_file)).chain(manifest.chapters());

    for (caption, file) in chapters {
        info!(caption, file, "processing chapter");

        if let Some(tex) = process_chapter(config, file)
            .with_context(|| format!("failed to process chapter `{file}`"))?
        {
            parts.append(caption, &tex);
        }
    }

    let document = compose(&template, parts, &config.slots(), &config.patch);

    let output_path = config.output_path();
    write_text(&output_path, &document).context("failed to write assembled book")?;
    info!(path = ?output_path, "book assembled");

    Ok(output_path)
}

/// Converts one chapter, returning its LaTeX.
/// Returns `None` if the conversion failed and the failure policy says to skip the chapter.
fn process_chapter(config: &Config, file: &str) -> Result<Option<String>> {
    let source = read_text(&config.source_path(file))?;

    let normalized = normalize(&source);
    if normalized.state == CitationState::Citation {
        warn!(file, "an epigraph is never closed; the rest of the chapter was quoted");
    }

    let scratch_path = config.scratch_path(file);
    if let Some(parent) = scratch_path.parent() {
        create_dir_all(parent)
            .with_context(|| format!("failed to create directory at {parent:?}"))?;
    }
    write_text(&scratch_path, &normalized.text)?;

    let conversion = config
        .converter
        .run(&scratch_path, config.converted_path(file))?;

    if !conversion.succeeded() {
        match config.on_converter_failure {
            FailurePolicy::Abort => {
                return Err(conversion.failure().context("conversion failed"));
            }
            FailurePolicy::Skip => {
                warn!(file, "leaving chapter out: {}", conversion.failure());
                return Ok(None);
            }
            FailurePolicy::Continue => {}
        }
    }

    conversion.read_output().map(Some)
}

#[cfg(all(test, unix))]
mod test {
    use super::assemble;
    use crate::{
        config::{Config, FailurePolicy},
        convert::test::{fake_converter, shell_converter, FAKE_CONVERTER},
    };
    use std::{fs, path::Path};
    use tempfile::TempDir;

    const TOC: &str = "parts:\n  - caption: Lessons\n    chapters:\n      - file: ch1\n";

    // Lays out `docs/` with a manifest, a front file, one chapter and a figure
    fn book_fixture(toc: &str) -> TempDir {
        let dir = tempfile::tempdir().expect("temporary directory creation should succeed");
        let docs = dir.path().join("docs");
        fs::create_dir_all(docs.join("figures")).expect("creating docs should succeed");
        fs::write(docs.join("figures/flow.svg"), "<svg/>").expect("writing should succeed");
        fs::write(docs.join("_toc.yml"), toc).expect("writing should succeed");
        fs::write(docs.join("front-print.md"), "Front\n").expect("writing should succeed");
        fs::write(
            docs.join("ch1.md"),
            "```{epigraph}\nQuoted\n```\nChapter one \u{1F320}\n",
        )
        .expect("writing should succeed");
        fs::write(
            dir.path().join("template.tex"),
            "F[-FRONTMATTER-]C[-CONTENT-]B[-BACKMATTER-]E",
        )
        .expect("writing should succeed");
        dir
    }

    fn config_for(dir: &Path) -> Config {
        Config {
            docs_dir: dir.join("docs").into(),
            scratch_dir: dir.join("tmp").into(),
            template_file: Some(dir.join("template.tex").into()),
            converter: fake_converter(&dir.join("tmp")),
            ..Config::default()
        }
    }

    #[test]
    fn assemble_book() {
        let dir = book_fixture(TOC);
        let config = config_for(dir.path());

        let output = assemble(&config).expect("assembly should succeed");

        assert_eq!(output, dir.path().join("tmp/exports/book-complete.tex"));
        assert_eq!(
            fs::read_to_string(&output).expect("output should exist"),
            "FTEX:Front\nCTEX:> Quoted\nTEX:Chapter one \nBE"
        );
        // Normalized sources and figures are left in the scratch directory
        assert_eq!(
            fs::read_to_string(dir.path().join("tmp/ch1.md")).expect("scratch copy should exist"),
            "> Quoted\nChapter one \n"
        );
        assert!(dir.path().join("tmp/figures/flow.svg").is_file());
    }

    #[test]
    fn builtin_template() {
        let dir = book_fixture(TOC);
        let config = Config {
            template_file: None,
            ..config_for(dir.path())
        };

        let document = fs::read_to_string(assemble(&config).expect("assembly should succeed"))
            .expect("output should exist");

        assert!(document.contains("\\part{Introduction}\n\nTEX:Front\n"));
        assert!(document.contains("\\part{Lessons}\n\nTEX:> Quoted\n"));
        assert!(document.contains("\\part{Extras}\n\n\n\n\\end{document}"));
        assert!(!document.contains("[-"));
    }

    #[test]
    fn missing_chapter_source() {
        let dir = book_fixture("parts:\n  - caption: Lessons\n    chapters:\n      - file: nope\n");
        let err = assemble(&config_for(dir.path())).expect_err("assembly should fail");
        assert!(format!("{err:#}").contains("nope"));
    }

    #[test]
    fn missing_figures() {
        let dir = book_fixture(TOC);
        fs::remove_dir_all(dir.path().join("docs/figures")).expect("removal should succeed");
        assert!(assemble(&config_for(dir.path())).is_err());
    }

    #[test]
    fn failure_policies() {
        // Fails on `ch1`, converts everything else
        let script = format!(
            r#"case "$2" in *ch1.md) echo "bad chapter" >&2; exit 1;; esac; {FAKE_CONVERTER}"#
        );

        let dir = book_fixture(TOC);
        let config = Config {
            converter: shell_converter(&script, &dir.path().join("tmp")),
            ..config_for(dir.path())
        };
        let err = assemble(&config).expect_err("aborting should fail the assembly");
        assert!(format!("{err:#}").contains("bad chapter"));

        let config = Config {
            on_converter_failure: FailurePolicy::Skip,
            ..config
        };
        let output = assemble(&config).expect("skipping should succeed");
        assert_eq!(
            fs::read_to_string(output).expect("output should exist"),
            "FTEX:Front\nCBE"
        );

        let config = Config {
            on_converter_failure: FailurePolicy::Continue,
            ..config
        };
        let err = assemble(&config).expect_err("reading absent output should fail");
        assert!(format!("{err:#}").contains("ch1.tex"));
    }

    #[test]
    fn nested_chapters() {
        let dir = book_fixture(&format!("{TOC}      - file: lessons/ch2\n"));
        let lessons = dir.path().join("docs/lessons");
        fs::create_dir(&lessons).expect("creating directory should succeed");
        fs::write(lessons.join("ch2.md"), "Chapter two\n").expect("writing should succeed");

        let output = assemble(&config_for(dir.path())).expect("assembly should succeed");

        assert_eq!(
            fs::read_to_string(output).expect("output should exist"),
            "FTEX:Front\nCTEX:> Quoted\nTEX:Chapter one \nTEX:Chapter two\nBE"
        );
        assert!(dir.path().join("tmp/exports/lessons/ch2.tex").is_file());
    }

    #[test]
    fn previous_run_output_is_not_reused() {
        let dir = book_fixture(TOC);
        let exports = dir.path().join("tmp/exports");
        fs::create_dir_all(&exports).expect("creating directory should succeed");
        for name in ["front-print.tex", "ch1.tex"] {
            fs::write(exports.join(name), "STALE\n").expect("writing should succeed");
        }

        // Exits successfully without writing anything
        let config = Config {
            converter: shell_converter("true", &dir.path().join("tmp")),
            ..config_for(dir.path())
        };

        let err = assemble(&config).expect_err("assembly should fail");
        assert!(format!("{err:#}").contains("no output was written"));
        assert!(!exports.join("front-print.tex").exists());
    }
}
