//! Invocation of the external Markdown-to-LaTeX converter.

use anyhow::{anyhow, Context, Result};
use common::read_text;
use serde::Deserialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};
use tracing::{debug, warn};

/// An external command that turns one Markdown file into one LaTeX file.
/// The command is run as `program args... <scratch_dir>/<file>.md`, and is expected to write
/// `<scratch_dir>/<exports_dir_name>/<file>.tex`.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Converter {
    pub program: Box<str>,
    pub args: Box<[Box<str>]>,
    #[serde(rename = "exports_dir")]
    pub exports_dir_name: Box<str>,
}

impl Default for Converter {
    fn default() -> Self {
        Self {
            program: "curvenote".into(),
            args: ["export".into(), "tex".into()].into(),
            exports_dir_name: "exports".into(),
        }
    }
}

/// The outcome of running the converter on one file.
#[derive(Debug)]
pub struct Conversion {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub output_path: PathBuf,
}

impl Converter {
    /// Derives where the converter writes its output for the chapter `file`,
    /// whose normalized copy lives under `scratch_dir`.
    #[must_use]
    pub fn output_path(&self, scratch_dir: &Path, file: &str) -> PathBuf {
        scratch_dir
            .join(&*self.exports_dir_name)
            .join(format!("{file}.tex"))
    }

    /// Runs the converter on `input`, blocking until it exits.
    /// Any file already at `output_path` is removed first, so an output file present afterwards
    /// was written by this run.
    /// A non-zero exit status is not an error here; callers inspect the returned [`Conversion`].
    ///
    /// # Errors
    /// This function returns an error if a previous output cannot be removed,
    /// or if the converter process cannot be started.
    pub fn run(&self, input: &Path, output_path: PathBuf) -> Result<Conversion> {
        match fs::remove_file(&output_path) {
            Ok(()) => debug!(?output_path, "removed previous converter output"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to remove previous converter output at {output_path:?}")
                });
            }
        }

        debug!(program = %self.program, ?input, "running converter");

        let output = Command::new(&*self.program)
            .args(self.args.iter().map(|arg| &**arg))
            .arg(input)
            .output()
            .with_context(|| format!("failed to start converter `{}`", self.program))?;

        let conversion = Conversion {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            output_path,
        };

        if !conversion.stdout.trim().is_empty() {
            debug!(?input, "converter output:\n{}", conversion.stdout.trim_end());
        }
        if !conversion.stderr.trim().is_empty() {
            warn!(?input, "converter reported:\n{}", conversion.stderr.trim_end());
        }

        Ok(conversion)
    }
}

impl Conversion {
    /// Whether the converter exited successfully and left an output file behind.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status.success() && self.output_path.is_file()
    }

    /// Summarizes a failed conversion for use in an error chain.
    #[must_use]
    pub fn failure(&self) -> anyhow::Error {
        let reason = if self.status.success() {
            format!("no output was written to {:?}", self.output_path)
        } else {
            format!("converter exited with {}", self.status)
        };

        match self.stderr.trim() {
            "" => anyhow!(reason),
            stderr => anyhow!("{reason}: {stderr}"),
        }
    }

    /// Reads the LaTeX the converter produced.
    ///
    /// # Errors
    /// This function returns an error if the output file does not exist or cannot be read.
    pub fn read_output(&self) -> Result<String> {
        read_text(&self.output_path).context("failed to read converter output")
    }
}

#[cfg(all(test, unix))]
pub(crate) mod test {
    use super::Converter;
    use std::{
        fs,
        path::{Path, PathBuf},
    };

    // Copies `$2` from under the scratch root `$1` to `$1/exports/<file>.tex`,
    // prefixing every line with `TEX:`
    pub(crate) const FAKE_CONVERTER: &str = concat!(
        r#"rel=${2#"$1"/}; out="$1/exports/${rel%.md}.tex"; "#,
        r#"mkdir -p "$(dirname "$out")" && sed 's/^/TEX:/' "$2" > "$out""#
    );

    pub(crate) fn fake_converter(scratch_dir: &Path) -> Converter {
        shell_converter(FAKE_CONVERTER, scratch_dir)
    }

    /// Runs `script` with the scratch root as `$1` and the input file as `$2`.
    pub(crate) fn shell_converter(script: &str, scratch_dir: &Path) -> Converter {
        Converter {
            program: "sh".into(),
            args: [
                "-c".into(),
                script.into(),
                "sh".into(),
                scratch_dir.to_string_lossy().into(),
            ]
            .into(),
            exports_dir_name: "exports".into(),
        }
    }

    #[test]
    fn output_path() {
        let converter = Converter::default();
        assert_eq!(
            converter.output_path(Path::new("tmp"), "intro"),
            PathBuf::from("tmp/exports/intro.tex")
        );
        assert_eq!(
            converter.output_path(Path::new("tmp"), "lessons/ch1"),
            PathBuf::from("tmp/exports/lessons/ch1.tex")
        );
        // Dots in a chapter id are kept
        assert_eq!(
            converter.output_path(Path::new("tmp"), "v1.2"),
            PathBuf::from("tmp/exports/v1.2.tex")
        );
    }

    #[test]
    fn successful_conversion() {
        let dir = tempfile::tempdir().expect("temporary directory creation should succeed");
        let input = dir.path().join("ch1.md");
        fs::write(&input, "a\nb\n").expect("writing input should succeed");

        let converter = fake_converter(dir.path());
        let conversion = converter
            .run(&input, converter.output_path(dir.path(), "ch1"))
            .expect("converter should start");

        assert!(conversion.succeeded());
        assert_eq!(conversion.output_path, dir.path().join("exports/ch1.tex"));
        assert_eq!(
            conversion.read_output().expect("output should be readable"),
            "TEX:a\nTEX:b\n"
        );
    }

    #[test]
    fn nested_chapter() {
        let dir = tempfile::tempdir().expect("temporary directory creation should succeed");
        let input = dir.path().join("lessons/ch1.md");
        fs::create_dir(dir.path().join("lessons")).expect("creating directory should succeed");
        fs::write(&input, "a\n").expect("writing input should succeed");

        let converter = fake_converter(dir.path());
        let conversion = converter
            .run(&input, converter.output_path(dir.path(), "lessons/ch1"))
            .expect("converter should start");

        assert!(conversion.succeeded());
        assert_eq!(conversion.output_path, dir.path().join("exports/lessons/ch1.tex"));
        assert_eq!(conversion.read_output().expect("output should be readable"), "TEX:a\n");
    }

    #[test]
    fn failed_conversion() {
        let dir = tempfile::tempdir().expect("temporary directory creation should succeed");
        let input = dir.path().join("ch1.md");
        fs::write(&input, "a\n").expect("writing input should succeed");

        let conversion = shell_converter("echo broken >&2; exit 3", dir.path())
            .run(&input, dir.path().join("exports/ch1.tex"))
            .expect("converter should start");

        assert!(!conversion.succeeded());
        assert_eq!(conversion.stderr, "broken\n");
        assert!(format!("{}", conversion.failure()).contains("broken"));

        // Reading the expected output regardless fails with the missing path
        let err = conversion
            .read_output()
            .expect_err("reading absent output should fail");
        assert!(format!("{err:#}").contains("ch1.tex"));
    }

    #[test]
    fn missing_output_with_success_status() {
        let dir = tempfile::tempdir().expect("temporary directory creation should succeed");
        let input = dir.path().join("ch1.md");

        let conversion = shell_converter("true", dir.path())
            .run(&input, dir.path().join("exports/ch1.tex"))
            .expect("converter should start");

        assert!(conversion.status.success());
        assert!(!conversion.succeeded());
        assert!(format!("{}", conversion.failure()).contains("no output was written"));
    }

    #[test]
    fn previous_output_is_removed() {
        let dir = tempfile::tempdir().expect("temporary directory creation should succeed");
        let input = dir.path().join("ch1.md");
        let output_path = dir.path().join("exports/ch1.tex");
        fs::create_dir(dir.path().join("exports")).expect("creating directory should succeed");
        fs::write(&output_path, "STALE").expect("writing old output should succeed");

        let conversion = shell_converter("true", dir.path())
            .run(&input, output_path.clone())
            .expect("converter should start");

        assert!(!output_path.exists());
        assert!(!conversion.succeeded());
    }

    #[test]
    fn missing_program() {
        let converter = Converter {
            program: "definitely-not-a-real-converter".into(),
            args: [].into(),
            exports_dir_name: "exports".into(),
        };
        assert!(converter.run(Path::new("x.md"), PathBuf::from("x.tex")).is_err());
    }
}
