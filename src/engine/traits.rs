use crate::error::RuleError;

/// The "Hot Path" membership check for one key type.
pub trait Matcher<K: ?Sized>: Send + Sync {
    /// Returns true if `key` belongs to the set.
    fn is_match(&self, key: &K) -> bool;
}

/// Mutable side of a matcher, fed one rule expression at a time by the loaders.
pub trait RuleSink {
    fn add_rule(&mut self, rule: &str) -> Result<(), RuleError>;

    /// Number of rules currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
