//! `:root` custom property inlining
//!
//! Three phases run once per stylesheet:
//!
//! 1. **Collect** - refuse to touch the sheet if any selector combines the
//!    root token with something else (`:root.dark`), otherwise move every
//!    `:root` declaration into a [`VariableMap`] and drop those rules.
//! 2. **Resolve** - expand references between variables to a fixed point.
//! 3. **Substitute** - rewrite every declaration that uses `var(--name)`, or
//!    drop it when any referenced name was never defined.

use crate::ast::Stylesheet;
use crate::error::Result;
use crate::variables::{ReferencePattern, VariableMap};
use serde::Serialize;
use std::fmt;

pub const ROOT_SELECTOR: &str = ":root";

/// Inliner settings
#[derive(Debug, Clone, PartialEq)]
pub struct InlineOptions {
    /// Selector whose declarations act as global variables
    pub root_selector: String,

    /// Log a warning for every dropped declaration and every variable left
    /// with a reference after resolution
    pub warn_undefined: bool,
}

impl Default for InlineOptions {
    fn default() -> Self {
        Self {
            root_selector: ROOT_SELECTOR.to_string(),
            warn_undefined: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InlineOutcome {
    /// Variables were inlined and the root rules removed
    Inlined,
    /// A selector such as `:root.dark` may override variables conditionally;
    /// nothing was changed
    SkippedComplexRoot { selector: String },
    /// No root rule found; nothing was changed
    NoRootVariables,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InlineWarning {
    /// A declaration was dropped because it references undefined variables
    UndefinedVariable {
        property: String,
        selector: Option<String>,
        names: Vec<String>,
        line: usize,
    },
    /// A variable still holds `var(...)` after resolution
    UnresolvedReference {
        name: String,
        value: String,
        line: usize,
    },
}

impl fmt::Display for InlineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InlineWarning::UndefinedVariable { property, selector, names, line } => write!(
                f,
                "line {}: dropped '{}' in '{}': undefined {}",
                line,
                property,
                selector.as_deref().unwrap_or("<top level>"),
                names.join(", ")
            ),
            InlineWarning::UnresolvedReference { name, value, line } => {
                write!(f, "line {}: variable '{}' left unresolved as '{}'", line, name, value)
            }
        }
    }
}

/// What one inlining run did to a stylesheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineReport {
    pub outcome: InlineOutcome,
    pub root_rules_removed: usize,
    pub variables_collected: usize,
    pub cyclic_variables: Vec<String>,
    pub resolve_passes: usize,
    pub declarations_rewritten: usize,
    pub declarations_removed: usize,
    pub warnings: Vec<InlineWarning>,
}

impl InlineReport {
    fn skipped(outcome: InlineOutcome) -> Self {
        Self {
            outcome,
            root_rules_removed: 0,
            variables_collected: 0,
            cyclic_variables: Vec::new(),
            resolve_passes: 0,
            declarations_rewritten: 0,
            declarations_removed: 0,
            warnings: Vec::new(),
        }
    }

    /// Whether the stylesheet was modified.
    pub fn is_inlined(&self) -> bool {
        self.outcome == InlineOutcome::Inlined
    }
}

impl fmt::Display for InlineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            InlineOutcome::Inlined => writeln!(f, "Outcome: inlined")?,
            InlineOutcome::SkippedComplexRoot { selector } => {
                writeln!(f, "Outcome: skipped, complex root selector '{}'", selector)?
            }
            InlineOutcome::NoRootVariables => writeln!(f, "Outcome: skipped, no root variables")?,
        }
        writeln!(f, "  Root rules removed: {}", self.root_rules_removed)?;
        writeln!(f, "  Variables collected: {}", self.variables_collected)?;
        if !self.cyclic_variables.is_empty() {
            writeln!(f, "  Circular variables: {}", self.cyclic_variables.join(", "))?;
        }
        writeln!(f, "  Resolve passes: {}", self.resolve_passes)?;
        writeln!(f, "  Declarations rewritten: {}", self.declarations_rewritten)?;
        write!(f, "  Declarations removed: {}", self.declarations_removed)?;
        for warning in &self.warnings {
            write!(f, "\n  warning: {}", warning)?;
        }
        Ok(())
    }
}

pub struct CssVarInliner {
    pattern: ReferencePattern,
    options: InlineOptions,
}

impl CssVarInliner {
    pub fn new(options: InlineOptions) -> Result<Self> {
        Ok(Self {
            pattern: ReferencePattern::new()?,
            options,
        })
    }

    pub fn options(&self) -> &InlineOptions {
        &self.options
    }

    /// Inline root variables into `sheet`. The sheet is left untouched unless
    /// the outcome is [`InlineOutcome::Inlined`].
    pub fn inline(&self, sheet: &mut Stylesheet) -> InlineReport {
        if let Some(selector) = self.find_complex_root_rule(sheet) {
            log::info!("Skipping inlining: '{}' may override root variables", selector);
            return InlineReport::skipped(InlineOutcome::SkippedComplexRoot { selector });
        }

        let Some((mut variables, root_rules_removed)) = self.collect_root_variables(sheet) else {
            log::debug!("No '{}' rules found, nothing to inline", self.options.root_selector);
            return InlineReport::skipped(InlineOutcome::NoRootVariables);
        };

        let resolution = variables.resolve(&self.pattern);
        log::debug!(
            "Resolved {} variables in {} passes",
            variables.len(),
            resolution.passes
        );

        let mut report = InlineReport {
            outcome: InlineOutcome::Inlined,
            root_rules_removed,
            variables_collected: variables.len(),
            cyclic_variables: resolution.cyclic,
            resolve_passes: resolution.passes,
            declarations_rewritten: 0,
            declarations_removed: 0,
            warnings: Vec::new(),
        };

        for def in variables.unresolved(&self.pattern) {
            let warning = InlineWarning::UnresolvedReference {
                name: def.name.clone(),
                value: def.value.clone(),
                line: def.def_line,
            };
            self.emit(&warning);
            report.warnings.push(warning);
        }

        self.substitute_declarations(sheet, &variables, &mut report);
        log::info!(
            "Inlined {} variables: {} declarations rewritten, {} removed",
            report.variables_collected,
            report.declarations_rewritten,
            report.declarations_removed
        );

        report
    }

    /// First selector that contains the root token without being exactly it.
    fn find_complex_root_rule(&self, sheet: &Stylesheet) -> Option<String> {
        let root = self.options.root_selector.as_str();
        let mut found = None;

        sheet.walk_rules(|rule| {
            if rule.selector.contains(root) && rule.selector != root {
                found = Some(rule.selector.clone());
                return false;
            }
            true
        });

        found
    }

    /// Move root declarations into a mapping and remove the root rules.
    /// Returns `None`, leaving the sheet as it was, when there are none.
    fn collect_root_variables(&self, sheet: &mut Stylesheet) -> Option<(VariableMap, usize)> {
        let rules = sheet.take_rules(&self.options.root_selector);
        if rules.is_empty() {
            return None;
        }

        let mut variables = VariableMap::new();
        for rule in &rules {
            for decl in rule.declarations() {
                if let Some(previous_line) = variables.insert(&decl.prop, &decl.value, decl.line) {
                    log::debug!(
                        "Line {}: variable '{}' redefined. Previous definition at line {}",
                        decl.line,
                        decl.prop,
                        previous_line
                    );
                }
            }
        }

        Some((variables, rules.len()))
    }

    fn substitute_declarations(
        &self,
        sheet: &mut Stylesheet,
        variables: &VariableMap,
        report: &mut InlineReport,
    ) {
        let pattern = &self.pattern;
        let mut warnings = Vec::new();
        let mut rewritten = 0;
        let mut removed = 0;

        sheet.retain_declarations(|decl, selector| {
            if !pattern.is_candidate(&decl.value) {
                return true;
            }

            let mut missing: Vec<String> = Vec::new();
            for name in pattern.names(&decl.value) {
                if !variables.contains(name) && !missing.iter().any(|m| m == name) {
                    missing.push(name.to_string());
                }
            }

            if !missing.is_empty() {
                warnings.push(InlineWarning::UndefinedVariable {
                    property: decl.prop.clone(),
                    selector: selector.map(str::to_string),
                    names: missing,
                    line: decl.line,
                });
                removed += 1;
                return false;
            }

            let new_value = pattern.substitute(&decl.value, |name| variables.get(name));
            if new_value != decl.value {
                decl.value = new_value;
                rewritten += 1;
            }
            true
        });

        for warning in &warnings {
            self.emit(warning);
        }
        report.warnings.extend(warnings);
        report.declarations_rewritten = rewritten;
        report.declarations_removed = removed;
    }

    fn emit(&self, warning: &InlineWarning) {
        if self.options.warn_undefined {
            log::warn!("{}", warning);
        } else {
            log::debug!("{}", warning);
        }
    }
}
