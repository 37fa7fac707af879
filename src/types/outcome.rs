use std::fmt;

/// The outcome of evaluating one compiled rule against an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct EvaluationResult {
    rule: String,
    status: String,
    blocking: bool,
    satisfied: bool,
}

impl EvaluationResult {
    pub fn new(
        rule: impl Into<String>,
        status: impl Into<String>,
        blocking: bool,
        satisfied: bool,
    ) -> Self {
        Self {
            rule: rule.into(),
            status: status.into(),
            blocking,
            satisfied,
        }
    }

    #[must_use]
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// The matched status: the rule's positive outcome when satisfied,
    /// otherwise its negative outcome.
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Whether a negative outcome should cause the caller to reject the
    /// operation. The rejection itself is the caller's decision.
    #[must_use]
    pub fn blocking(&self) -> bool {
        self.blocking
    }

    #[must_use]
    pub fn satisfied(&self) -> bool {
        self.satisfied
    }
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} (satisfied: {})",
            self.rule, self.status, self.satisfied
        )
    }
}
