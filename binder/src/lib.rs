mod compose;
mod config;
mod convert;
mod manifest;
mod normalize;
mod patch;
mod pipeline;

pub use compose::{compose, copy_dir_all, validate_template, BookParts, Slot, TEMPLATE};
pub use config::{Config, FailurePolicy, PartSlot, DEFAULT_CONFIG_FILE};
pub use convert::{Conversion, Converter};
pub use manifest::{Chapter, Manifest, Part};
pub use normalize::{normalize, normalize_line, CitationState, Normalized};
pub use patch::{patch, patch_line, BlockState, PatchRules, Patched, Substitutions};
pub use pipeline::assemble;
