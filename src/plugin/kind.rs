use super::Plugin;
use crate::engine::{DomainMixMatcher, IpList, Matcher, RuleSink};
use std::net::IpAddr;
use std::sync::Arc;

/// Ties a key type to its rule builder and provider capability, so sets,
/// remote sources and the registry share one code path for domains and IPs.
pub trait SetKind: Send + Sync + 'static {
    type Key: ?Sized + Send + Sync + 'static;
    type Builder: RuleSink + Default + Send + 'static;

    /// Plugin type name in the config.
    const PLUGIN_TYPE: &'static str;
    /// Capability name used in error messages.
    const CAPABILITY: &'static str;

    /// Freezes a loaded builder into an immutable matcher, returned with its
    /// rule count.
    fn build(builder: Self::Builder) -> (Arc<dyn Matcher<Self::Key>>, usize);

    fn provided_by(plugin: &dyn Plugin) -> Option<Arc<dyn Matcher<Self::Key>>>;
}

pub struct DomainKind;

impl SetKind for DomainKind {
    type Key = str;
    type Builder = DomainMixMatcher;

    const PLUGIN_TYPE: &'static str = "domain_set";
    const CAPABILITY: &'static str = "DomainMatcherProvider";

    fn build(builder: DomainMixMatcher) -> (Arc<dyn Matcher<str>>, usize) {
        let rules = builder.len();
        (Arc::new(builder), rules)
    }

    fn provided_by(plugin: &dyn Plugin) -> Option<Arc<dyn Matcher<str>>> {
        plugin.as_domain_provider().map(|p| p.domain_matcher())
    }
}

pub struct IpKind;

impl SetKind for IpKind {
    type Key = IpAddr;
    type Builder = IpList;

    const PLUGIN_TYPE: &'static str = "ip_set";
    const CAPABILITY: &'static str = "IpMatcherProvider";

    fn build(mut builder: IpList) -> (Arc<dyn Matcher<IpAddr>>, usize) {
        // Counted after merging
        builder.sort();
        let rules = builder.len();
        (Arc::new(builder), rules)
    }

    fn provided_by(plugin: &dyn Plugin) -> Option<Arc<dyn Matcher<IpAddr>>> {
        plugin.as_ip_provider().map(|p| p.ip_matcher())
    }
}
