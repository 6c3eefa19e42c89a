//! Plugins and the typed capabilities they expose to each other.

mod kind;
mod registry;
mod set;

pub use kind::{DomainKind, IpKind, SetKind};
pub use registry::Registry;
pub use set::{DomainSet, IpSet, RuleSet};

use crate::engine::Matcher;
use std::net::IpAddr;
use std::sync::Arc;

/// A named component registered under a tag.
pub trait Plugin: Send + Sync {
    fn plugin_type(&self) -> &'static str;

    fn as_domain_provider(&self) -> Option<&dyn DomainMatcherProvider> {
        None
    }

    fn as_ip_provider(&self) -> Option<&dyn IpMatcherProvider> {
        None
    }
}

pub trait DomainMatcherProvider: Send + Sync {
    fn domain_matcher(&self) -> Arc<dyn Matcher<str>>;
}

pub trait IpMatcherProvider: Send + Sync {
    fn ip_matcher(&self) -> Arc<dyn Matcher<IpAddr>>;
}
