//! SPDX declaration engine.
//!
//! Per file, the engine runs a strictly sequential pipeline over an in-memory
//! buffer:
//!
//! 1. [`extract`](extract::extract) the leading comment block
//! 2. [`parse`](parse::parse) it into a [`Declaration`]
//! 3. [`validate`](validate::validate) the declaration against a [`RuleSet`]
//! 4. [`correct`](correct::correct) it into a [`CorrectionPlan`] when invalid
//!
//! The engine holds only immutable data and never touches the filesystem, so
//! one instance can be shared across worker threads.

pub mod correct;
pub mod expression;
pub mod extract;
pub mod licenses;
pub mod parse;
pub mod syntax;
pub mod types;
pub mod validate;


use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

pub use correct::{CorrectionOptions, Defaults, RepairStrategy, Template, Templates};
pub use licenses::LicenseList;
pub use syntax::{CommentSyntax, Language, syntax_for};
pub use types::{
    CopyrightLine, CorrectionPlan, Declaration, DeclarationStyle, EngineError, Field, Issue,
    RawHeader, SpdxTag, TextLine, ValidationOutcome, YearRange,
};
pub use validate::RuleSet;

/// What to do with files whose language has no comment syntax.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedPolicy {
    /// Leave the file alone and report it as skipped.
    #[default]
    Skip,
    /// Treat the file as if it used `#` line comments.
    HashComment,
}

/// Extraction, parse and validation results for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct Inspection {
    pub header: RawHeader,
    pub declaration: Declaration,
    pub validation: ValidationOutcome,
}

impl Inspection {
    pub fn needs_correction(&self) -> bool {
        !self.validation.valid || self.declaration.declaration_style == DeclarationStyle::Absent
    }
}

/// Final state of one file after the pipeline ran.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    AlreadyValid(Inspection),
    Corrected {
        inspection: Inspection,
        plan: CorrectionPlan,
        corrected: Vec<u8>,
    },
    Skipped {
        reason: String,
    },
    Failed {
        inspection: Option<Inspection>,
        reason: String,
    },
}

impl FileOutcome {
    pub fn inspection(&self) -> Option<&Inspection> {
        match self {
            Self::AlreadyValid(inspection) | Self::Corrected { inspection, .. } => Some(inspection),
            Self::Failed { inspection, .. } => inspection.as_ref(),
            Self::Skipped { .. } => None,
        }
    }
}

/// Shared, immutable configuration for running the pipeline on many files.
#[derive(Debug, Clone)]
pub struct DeclarationEngine {
    licenses: Arc<LicenseList>,
    configured_rules: RuleSet,
    /// `configured_rules` with the year bound resolved against `options.current_year`.
    rules: RuleSet,
    templates: Templates,
    options: CorrectionOptions,
    unsupported: UnsupportedPolicy,
}

impl DeclarationEngine {
    /// Create an engine with the built-in template and default correction options.
    pub fn new(licenses: Arc<LicenseList>, rules: RuleSet) -> Self {
        let options = CorrectionOptions::default();
        Self {
            licenses,
            rules: rules.clone().with_default_max_year(options.current_year),
            configured_rules: rules,
            templates: Templates::default(),
            options,
            unsupported: UnsupportedPolicy::default(),
        }
    }

    pub fn with_templates(mut self, templates: Templates) -> Self {
        self.templates = templates;
        self
    }

    /// Replace the correction options. An unset `max_year` rule follows
    /// `options.current_year`.
    pub fn with_options(mut self, options: CorrectionOptions) -> Self {
        self.rules = self
            .configured_rules
            .clone()
            .with_default_max_year(options.current_year);
        self.options = options;
        self
    }

    pub fn with_unsupported_policy(mut self, policy: UnsupportedPolicy) -> Self {
        self.unsupported = policy;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn licenses(&self) -> &LicenseList {
        &self.licenses
    }

    /// Comment syntax for `language`, honoring the unsupported-language policy.
    pub fn syntax(&self, language: Language) -> Result<CommentSyntax, EngineError> {
        match syntax_for(language) {
            Err(EngineError::UnsupportedLanguage(_))
                if self.unsupported == UnsupportedPolicy::HashComment =>
            {
                Ok(CommentSyntax::HASH)
            }
            result => result,
        }
    }

    /// Extract, parse and validate without computing a correction.
    pub fn inspect(&self, content: &[u8], language: Language) -> Result<Inspection, EngineError> {
        let syntax = self.syntax(language)?;
        let header = extract::extract_with_syntax(content, &syntax);
        let declaration = parse::parse(&header);
        let validation = validate::validate(&declaration, &self.rules, &self.licenses);
        debug!(
            "{} header {}..{}: {} error(s), {} warning(s)",
            language,
            header.byte_start,
            header.byte_end,
            validation.errors.len(),
            validation.warnings.len()
        );

        Ok(Inspection {
            header,
            declaration,
            validation,
        })
    }

    /// Run the full pipeline on one buffer.
    pub fn process(&self, content: &[u8], language: Language) -> FileOutcome {
        let inspection = match self.inspect(content, language) {
            Ok(inspection) => inspection,
            Err(e @ EngineError::UnsupportedLanguage(_)) => {
                return FileOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
            Err(e) => {
                return FileOutcome::Failed {
                    inspection: None,
                    reason: e.to_string(),
                };
            }
        };

        if !inspection.needs_correction() {
            return FileOutcome::AlreadyValid(inspection);
        }

        let plan = match correct::correct(
            content,
            &inspection.header,
            &inspection.declaration,
            &inspection.validation,
            self.templates.for_language(language),
            &self.options,
        ) {
            Ok(plan) => plan,
            // Nothing is required and nothing could be filled in.
            Err(EngineError::MissingDefault { .. }) if inspection.validation.valid => {
                return FileOutcome::AlreadyValid(inspection);
            }
            Err(e) => {
                return FileOutcome::Failed {
                    inspection: Some(inspection),
                    reason: e.to_string(),
                };
            }
        };

        let corrected = match plan.apply(content) {
            Ok(corrected) => corrected,
            Err(e) => {
                return FileOutcome::Failed {
                    inspection: Some(inspection),
                    reason: e.to_string(),
                };
            }
        };

        let recheck = match self.inspect(&corrected, language) {
            Ok(recheck) => recheck,
            Err(e) => {
                return FileOutcome::Failed {
                    inspection: Some(inspection),
                    reason: e.to_string(),
                };
            }
        };

        if !splice_intact(content, &corrected, &plan, &recheck.header) {
            return FileOutcome::Failed {
                inspection: Some(inspection),
                reason: "Corrected header does not re-extract as one comment block".to_string(),
            };
        }

        // A template that does not round-trip through the parser would leave the file invalid.
        if !recheck.validation.valid {
            let codes: Vec<&str> = recheck.validation.errors.iter().map(|e| e.code).collect();
            return FileOutcome::Failed {
                inspection: Some(inspection),
                reason: format!(
                    "Corrected header still fails validation: {}",
                    codes.join(", ")
                ),
            };
        }

        FileOutcome::Corrected {
            inspection,
            plan,
            corrected,
        }
    }
}

/// Whether the bytes after the new header are the original remainder and
/// the whole new header sits inside the re-extracted comment block.
fn splice_intact(
    original: &[u8],
    corrected: &[u8],
    plan: &CorrectionPlan,
    reextracted: &RawHeader,
) -> bool {
    let start = plan.replace_span.start;
    let header_end = start + plan.new_header_text.len();
    let rendered_end = start + plan.new_header_text.trim_end_matches(['\r', '\n']).len();

    corrected.get(header_end..) == original.get(plan.replace_span.end..)
        && reextracted.byte_end >= rendered_end
}
