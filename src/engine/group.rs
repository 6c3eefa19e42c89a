use super::traits::Matcher;
use std::sync::Arc;

/// Ordered OR of matchers. The first component reporting a hit wins.
pub struct MatcherGroup<K: ?Sized + 'static> {
    matchers: Vec<Arc<dyn Matcher<K>>>,
}

impl<K: ?Sized + 'static> MatcherGroup<K> {
    pub fn new(matchers: Vec<Arc<dyn Matcher<K>>>) -> Self {
        Self { matchers }
    }

    pub fn push(&mut self, matcher: Arc<dyn Matcher<K>>) {
        self.matchers.push(matcher);
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl<K: ?Sized + 'static> Default for MatcherGroup<K> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<K: ?Sized + 'static> Matcher<K> for MatcherGroup<K> {
    fn is_match(&self, key: &K) -> bool {
        self.matchers.iter().any(|m| m.is_match(key))
    }
}
