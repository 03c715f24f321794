use crate::diff::ChangeSet;

/// The person (or script) deciding whether pending changes are applied
///
/// The sync engine never touches the terminal itself; it hands the change
/// set to an operator and acts on the answer.
pub trait Operator: Send + Sync {
    /// Show the pending changes
    fn present(&self, changes: &ChangeSet);

    /// Ask whether the changes should be applied
    fn confirm(&self, changes: &ChangeSet) -> bool;
}

/// Operator that never prompts and always gives the same answer
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Operator for FixedAnswer {
    fn present(&self, changes: &ChangeSet) {
        tracing::info!(
            "{} addition(s), {} removal(s) pending",
            changes.additions(),
            changes.removals()
        );
    }

    fn confirm(&self, _changes: &ChangeSet) -> bool {
        self.0
    }
}
