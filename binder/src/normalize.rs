//! Rewrites MyST-flavoured Markdown so that the external converter accepts it.
//!
//! Directives the converter doesn't understand are mapped onto admonitions,
//! and epigraph blocks become plain blockquotes.

const EPIGRAPH: &str = "{epigraph}";
const DROPDOWN: &str = "{dropdown}";
const MARGIN: &str = "{margin}";
const TABBED: &str = "{tabbed}";
const FENCE: &str = "```";
const QUOTE_PREFIX: &str = "> ";
const STRIPPED_GLYPHS: [char; 2] = ['\u{1F320}', '\u{1F308}'];

/// Whether the current line is inside an epigraph block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CitationState {
    #[default]
    Prose,
    Citation,
}

#[derive(Debug)]
pub struct Normalized {
    pub text: String,
    /// State after the last line. `Citation` means an epigraph was never closed.
    pub state: CitationState,
}

/// Normalizes a single line.
/// Returns the state for the next line and the text to emit, if any.
#[must_use]
pub fn normalize_line(state: CitationState, line: &str) -> (CitationState, Option<String>) {
    match state {
        CitationState::Citation if line.contains(FENCE) => (CitationState::Prose, None),
        CitationState::Citation => (state, Some(format!("{QUOTE_PREFIX}{line}"))),
        CitationState::Prose if line.contains(EPIGRAPH) => (CitationState::Citation, None),
        CitationState::Prose if line.contains(DROPDOWN) => {
            (state, Some(line.replace("dropdown", "admonition")))
        }
        CitationState::Prose if line.contains(MARGIN) => {
            (state, Some(line.replace(MARGIN, "{admonition} Note")))
        }
        CitationState::Prose if line.contains(TABBED) => {
            (state, Some(line.replace(TABBED, "{admonition}")))
        }
        CitationState::Prose => (state, Some(line.replace(STRIPPED_GLYPHS, ""))),
    }
}

/// Normalizes chapter source text line by line.
#[must_use]
pub fn normalize(text: &str) -> Normalized {
    let mut state = CitationState::default();
    let mut lines = Vec::new();

    for line in text.split('\n') {
        let (next, emitted) = normalize_line(state, line);
        state = next;
        lines.extend(emitted);
    }

    Normalized {
        text: lines.join("\n"),
        state,
    }
}
