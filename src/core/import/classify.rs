use super::layout::DevpostRow;

/// Placeholder title DevPost gives projects that were never named
pub const UNTITLED: &str = "Untitled";

/// Status prefix of projects that were actually submitted
pub const SUBMITTED_PREFIX: &str = "Submitted";

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum RowClass {
    /// A submitted project that should be imported
    Eligible,
    /// Blank or placeholder row, dropped without counting
    Ignored,
    /// A project that was started but not submitted
    Draft,
}

pub fn classify(row: &DevpostRow) -> RowClass {
    if row.submission_url.is_empty() || row.title == UNTITLED {
        RowClass::Ignored
    } else if !row.status.starts_with(SUBMITTED_PREFIX) {
        RowClass::Draft
    } else {
        RowClass::Eligible
    }
}
