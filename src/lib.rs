//! CSS custom property inliner
//!
//! Replaces `var(--name)` references with the values declared in `:root`
//! rules, producing stylesheets that need no variable lookups at runtime.
//!
//! # Basic Usage
//!
//! ```rust
//! use inline_css_vars::{inline_str, Result};
//!
//! fn main() -> Result<()> {
//!     let (css, _report) = inline_str(":root { --c: red; } h1 { color: var(--c); }")?;
//!     assert_eq!(css, "h1 { color: red; }");
//!     Ok(())
//! }
//! ```
//!
//! # Pipeline
//!
//! 1. **Parse** - CSS text into a lossless tree ([`parser`])
//! 2. **Collect** - `:root` declarations into a variable map, root rules removed
//! 3. **Resolve** - references between variables expanded to a fixed point
//! 4. **Substitute** - declarations rewritten, or dropped when they use an
//!    undefined variable
//! 5. **Print** - tree back to text ([`stringify`])
//!
//! A stylesheet containing a compound root selector such as `:root.dark`, or
//! no root rule at all, comes back byte for byte unchanged.

pub mod ast;
pub mod cli;
pub mod error;
pub mod inliner;
pub mod parser;
pub mod stringify;
pub mod variables;

use serde::Serialize;
use std::fs;
use std::io;
use std::time::Instant;

// Re-export commonly used types and functions
pub use ast::{AtRule, Comment, Declaration, Node, Rule, Stylesheet};
pub use error::{InlinerError, Result};
pub use inliner::{CssVarInliner, InlineOptions, InlineOutcome, InlineReport, InlineWarning, ROOT_SELECTOR};
pub use parser::{parse, Parser};
pub use stringify::{stringify, Stringifier};
pub use variables::{ReferencePattern, Resolution, VariableDef, VariableMap, VAR_REFERENCE_PATTERN};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Statistics for one processed file
#[derive(Debug, Clone, Serialize)]
pub struct InlineStats {
    /// Input size in bytes
    pub source_size: u64,

    /// Output size in bytes
    pub output_size: u64,

    /// Wall time spent parsing, inlining and printing
    pub inline_time_ms: u64,

    pub report: InlineReport,
}

/// Inline root variables in CSS source with default options
pub fn inline_str(source: &str) -> Result<(String, InlineReport)> {
    inline_str_with_options(source, &InlineOptions::default())
}

/// Inline root variables in CSS source with custom options
pub fn inline_str_with_options(source: &str, options: &InlineOptions) -> Result<(String, InlineReport)> {
    let mut sheet = parse(source)?;
    log::debug!(
        "Parsed {} rules and {} declarations",
        sheet.rule_count(),
        sheet.declaration_count()
    );

    let inliner = CssVarInliner::new(options.clone())?;
    let report = inliner.inline(&mut sheet);

    // Untouched sheets are returned verbatim rather than re-printed
    if !report.is_inlined() {
        return Ok((source.to_string(), report));
    }

    Ok((stringify(&sheet), report))
}

/// Read a stylesheet from disk. Only a missing file is reported as
/// [`InlinerError::FileNotFound`]; permission or encoding failures stay
/// [`InlinerError::Io`].
pub fn read_source(path: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => InlinerError::FileNotFound {
            path: path.to_string(),
        },
        _ => InlinerError::Io(e),
    })
}

/// Main entry point with default options
pub fn inline_file(input_path: &str, output_path: &str) -> Result<InlineStats> {
    inline_file_with_options(input_path, output_path, &InlineOptions::default())
}

/// Read `input_path`, inline its variables and write the result to
/// `output_path`.
pub fn inline_file_with_options(
    input_path: &str,
    output_path: &str,
    options: &InlineOptions,
) -> Result<InlineStats> {
    let start_time = Instant::now();
    log::info!("Inlining '{}' to '{}'...", input_path, output_path);

    let source = read_source(input_path)?;

    let (output, report) = inline_str_with_options(&source, options)?;
    fs::write(output_path, &output)?;

    let stats = InlineStats {
        source_size: source.len() as u64,
        output_size: output.len() as u64,
        inline_time_ms: start_time.elapsed().as_millis() as u64,
        report,
    };
    log::debug!("Full stats: {:?}", stats);

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_inline_str() {
        let (css, report) = inline_str(":root { --c: #ff0000; } h1 { color: var(--c); }").unwrap();
        assert_eq!(css, "h1 { color: #ff0000; }");
        assert!(report.is_inlined());
    }

    #[test]
    fn test_untouched_source_is_returned_verbatim() {
        let source = "\n\n:root.dark { --a: #000; }\n.w { color: var(--a); }\n";
        let (css, report) = inline_str(source).unwrap();
        assert_eq!(css, source);
        assert!(!report.is_inlined());
    }

    #[test]
    fn test_inline_file() {
        let temp_dir = TempDir::new().unwrap();
        let input_path = temp_dir.path().join("theme.css");
        let output_path = temp_dir.path().join("theme.out.css");

        fs::write(
            &input_path,
            ":root {\n  --gap: 8px;\n}\n.grid {\n  gap: var(--gap);\n  margin: var(--unknown);\n}\n",
        )
        .unwrap();

        let stats = inline_file(input_path.to_str().unwrap(), output_path.to_str().unwrap()).unwrap();

        let output = fs::read_to_string(&output_path).unwrap();
        assert_eq!(output, ".grid {\n  gap: 8px;\n}\n");
        assert_eq!(stats.output_size, output.len() as u64);
        assert_eq!(stats.report.declarations_removed, 1);
    }

    #[test]
    fn test_inline_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.css");
        let output = temp_dir.path().join("out.css");

        let result = inline_file(missing.to_str().unwrap(), output.to_str().unwrap());
        assert!(matches!(result, Err(InlinerError::FileNotFound { .. })));
    }

    #[test]
    fn test_unreadable_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let binary = temp_dir.path().join("binary.css");
        let output = temp_dir.path().join("out.css");
        fs::write(&binary, [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let result = inline_file(binary.to_str().unwrap(), output.to_str().unwrap());
        assert!(matches!(result, Err(InlinerError::Io(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_parse_error_is_propagated() {
        let result = inline_str(":root { --a: 1px; ");
        assert!(matches!(result, Err(InlinerError::Parse { .. })));
    }
}
