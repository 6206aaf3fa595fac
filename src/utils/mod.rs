pub mod file;
pub mod hash;
pub mod language;

use chrono::Datelike;

/// The local calendar year.
pub fn current_year() -> i32 {
    chrono::Local::now().year()
}
