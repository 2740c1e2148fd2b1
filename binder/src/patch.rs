//! Post-processing of converter-emitted LaTeX for final typesetting.

use serde::Deserialize;

const INCLUDE_GRAPHICS: &str = "includegraphics";
const INCLUDE_SVG: &str = "includesvg";
const STARRED_CAPTION: &str = "caption*";
const BEGIN_VERBATIM: &str = r"\begin{verbatim}";
const END_VERBATIM: &str = r"\end{verbatim}";
const END_LISTING: &str = r"\end{lstlisting}";
const BEGIN_QUOTE: &str = r"\begin{quote}";
const END_QUOTE: &str = r"\end{quote}";
const BEGIN_QUOTEBOX: &str = r"\begin{quotebox}{quote}";
const END_QUOTEBOX: &str = r"\end{quotebox}";

/// An ordered list of literal `(find, replace)` pairs.
/// Pairs are applied one after another, so later pairs see the output of earlier ones.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Substitutions(Vec<(Box<str>, Box<str>)>);

impl Substitutions {
    #[must_use]
    pub fn new<const N: usize>(pairs: [(&str, &str); N]) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(find, replace)| (find.into(), replace.into()))
                .collect(),
        )
    }

    /// Repairs converter artifacts inside code listings.
    #[must_use]
    pub fn code_fixes() -> Self {
        Self::new([
            ("- -", "--"),
            (" - ", "-"),
            ("true -neutral -cookiecutter", "true-neutral-cookiecutter"),
            (" -forge", "-forge"),
            ("| --", "|--"),
            ("egg -info", "egg-info"),
            ("sphinx -quickstart", "sphinx-quickstart"),
            ("non -integer", "non-integer"),
            ("codebook -testbucket", "codebook-testbucket"),
        ])
    }

    /// Text fixes applied outside code listings.
    #[must_use]
    pub fn prose_fixes() -> Self {
        Self::new([("testing.md", "testing")])
    }

    #[must_use]
    pub fn apply(&self, line: &str) -> String {
        self.0
            .iter()
            .fold(line.to_owned(), |line, (find, replace)| {
                line.replace(&**find, replace)
            })
    }
}

/// Whether the current line is inside a code listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlockState {
    #[default]
    Prose,
    Code,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatchRules {
    /// Language hint attached to every listing
    pub language: Box<str>,
    pub code_fixes: Substitutions,
    pub prose_fixes: Substitutions,
    /// Restyle `quote` environments as `quotebox`es
    pub quote_boxes: bool,
}

impl Default for PatchRules {
    fn default() -> Self {
        Self {
            language: "Python".into(),
            code_fixes: Substitutions::code_fixes(),
            prose_fixes: Substitutions::prose_fixes(),
            quote_boxes: true,
        }
    }
}

#[derive(Debug)]
pub struct Patched {
    pub text: String,
    /// State after the last line. `Code` means a verbatim block was never closed.
    pub state: BlockState,
}

/// Patches a single line of LaTeX.
/// Returns the state for the next line and the rewritten line.
#[must_use]
pub fn patch_line(state: BlockState, line: &str, rules: &PatchRules) -> (BlockState, String) {
    if line.contains(".svg") && line.contains(INCLUDE_GRAPHICS) {
        (state, line.replace(INCLUDE_GRAPHICS, INCLUDE_SVG))
    } else if line.contains(STARRED_CAPTION) {
        (state, line.replace(STARRED_CAPTION, "caption"))
    } else if line.contains(BEGIN_VERBATIM) {
        let opener = format!(r"\begin{{lstlisting}}[language={}]", rules.language);
        (BlockState::Code, line.replace(BEGIN_VERBATIM, &opener))
    } else if line.contains(END_VERBATIM) {
        (BlockState::Prose, line.replace(END_VERBATIM, END_LISTING))
    } else if rules.quote_boxes && line.contains(BEGIN_QUOTE) {
        (state, BEGIN_QUOTEBOX.to_owned())
    } else if rules.quote_boxes && line.contains(END_QUOTE) {
        (state, END_QUOTEBOX.to_owned())
    } else {
        match state {
            BlockState::Code => (state, rules.code_fixes.apply(line)),
            BlockState::Prose => (state, rules.prose_fixes.apply(line)),
        }
    }
}

/// Patches LaTeX text line by line, starting outside any code listing.
#[must_use]
pub fn patch(text: &str, rules: &PatchRules) -> Patched {
    let mut state = BlockState::default();
    let mut lines = Vec::new();

    for line in text.split('\n') {
        let (next, patched) = patch_line(state, line, rules);
        state = next;
        lines.push(patched);
    }

    Patched {
        text: lines.join("\n"),
        state,
    }
}
