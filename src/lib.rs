pub mod cli;
pub mod config;
pub mod declaration;
pub mod models;
pub mod scanner;
pub mod utils;

pub use declaration::{DeclarationEngine, FileOutcome, Inspection, Language, LicenseList, RuleSet};
pub use models::{ExtraData, FileReport, FileStatus, Header, Output};
pub use scanner::{Mode, ProcessResult, ScanSettings, count, process};
