//! Collector for soft, per-item issues.
//!
//! Parsing and applying never stop on a bad item; the issue is recorded here and
//! flushed as one `tracing` event per operation.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    messages: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// True if any recorded message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages.iter().any(|m| m.contains(needle))
    }

    /// Log all messages as a single error event under `context`.
    pub fn emit(&self, context: &str) {
        if self.messages.is_empty() {
            return;
        }
        tracing::error!(
            count = self.messages.len(),
            "[Smart] {context}: {}",
            self.messages.join("; ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_contains() {
        let mut diags = Diagnostics::new();
        assert!(diags.is_empty());
        diags.push("transform std has no feature indices");
        diags.push(String::from("invalid feature index 'x' at line 3"));
        assert_eq!(diags.len(), 2);
        assert!(diags.contains("line 3"));
        assert!(!diags.contains("robust"));
        diags.emit("Transform parsing errors");
    }
}
