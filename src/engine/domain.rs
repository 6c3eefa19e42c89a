use super::traits::{Matcher, RuleSink};
use crate::error::RuleError;
use regex::Regex;
use rustc_hash::FxHashSet;
use std::borrow::Cow;

// Longest name we lowercase on the stack; longer input falls back to the heap.
const STACK_NAME_LEN: usize = 256;

/// Domain matcher mixing the four expression types:
///
/// - `full:example.com` matches exactly `example.com`
/// - `domain:example.com` matches `example.com` and every subdomain
/// - `keyword:ads` matches any name containing `ads`
/// - `regexp:^ad[0-9]+\.` matches names the regex accepts
///
/// An expression without a type prefix is a `domain:` rule. Names are compared
/// lowercased and without the trailing root dot.
#[derive(Debug, Default)]
pub struct DomainMixMatcher {
    full: FxHashSet<Box<str>>,
    domains: FxHashSet<Box<str>>,
    keywords: Vec<Box<str>>,
    regexes: Vec<Regex>,
}

impl DomainMixMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_full(&mut self, name: &str) -> Result<(), RuleError> {
        let name = normalize(name).ok_or(RuleError::Empty)?;
        self.full.insert(name.into_owned().into_boxed_str());
        Ok(())
    }

    pub fn add_domain(&mut self, name: &str) -> Result<(), RuleError> {
        let name = normalize(name).ok_or(RuleError::Empty)?;
        self.domains.insert(name.into_owned().into_boxed_str());
        Ok(())
    }

    pub fn add_keyword(&mut self, keyword: &str) -> Result<(), RuleError> {
        if keyword.is_empty() {
            return Err(RuleError::Empty);
        }
        let keyword = keyword.to_ascii_lowercase().into_boxed_str();
        if !self.keywords.contains(&keyword) {
            self.keywords.push(keyword);
        }
        Ok(())
    }

    pub fn add_regex(&mut self, pattern: &str) -> Result<(), RuleError> {
        if pattern.is_empty() {
            return Err(RuleError::Empty);
        }
        self.regexes.push(Regex::new(pattern)?);
        Ok(())
    }

    fn match_normalized(&self, name: &str) -> bool {
        if self.full.contains(name) {
            return true;
        }

        // Iterative suffix match
        if !self.domains.is_empty() {
            let mut part = name;
            loop {
                if self.domains.contains(part) {
                    return true;
                }
                match part.find('.') {
                    Some(idx) => {
                        part = &part[idx + 1..];
                        if part.is_empty() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }

        if self.keywords.iter().any(|k| name.contains(&**k)) {
            return true;
        }

        self.regexes.iter().any(|re| re.is_match(name))
    }
}

/// Lowercase and strip the root dot. Returns None for an empty name.
fn normalize(name: &str) -> Option<Cow<'_, str>> {
    let name = name.trim();
    let name = name.strip_suffix('.').unwrap_or(name);
    if name.is_empty() {
        return None;
    }
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        Some(Cow::Owned(name.to_ascii_lowercase()))
    } else {
        Some(Cow::Borrowed(name))
    }
}

impl RuleSink for DomainMixMatcher {
    fn add_rule(&mut self, rule: &str) -> Result<(), RuleError> {
        let rule = rule.trim();
        let (kind, pattern) = rule.split_once(':').unwrap_or(("domain", rule));
        match kind {
            "full" => self.add_full(pattern),
            "domain" => self.add_domain(pattern),
            "keyword" => self.add_keyword(pattern),
            "regexp" => self.add_regex(pattern),
            other => Err(RuleError::UnknownType(other.to_string())),
        }
    }

    fn len(&self) -> usize {
        self.full.len() + self.domains.len() + self.keywords.len() + self.regexes.len()
    }
}

impl Matcher<str> for DomainMixMatcher {
    fn is_match(&self, name: &str) -> bool {
        let name = name.strip_suffix('.').unwrap_or(name);
        if !name.bytes().any(|b| b.is_ascii_uppercase()) {
            return self.match_normalized(name);
        }

        let mut buf = [0u8; STACK_NAME_LEN];
        if name.len() > buf.len() {
            return self.match_normalized(&name.to_ascii_lowercase());
        }
        let buf = &mut buf[..name.len()];
        buf.copy_from_slice(name.as_bytes());
        buf.make_ascii_lowercase();
        match std::str::from_utf8(buf) {
            Ok(lower) => self.match_normalized(lower),
            Err(_) => false,
        }
    }
}
