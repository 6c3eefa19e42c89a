use super::kind::{DomainKind, IpKind, SetKind};
use super::registry::Registry;
use super::{DomainMatcherProvider, IpMatcherProvider, Plugin};
use crate::config::{RemoteFile, SetArgs};
use crate::engine::loader::load_exps_and_files;
use crate::engine::{Matcher, MatcherGroup};
use crate::error::SetError;
use crate::remote::{spawn_refresher, RemoteSource};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::info;
use url::Url;

/// A domain or IP set composed of, in order: the static rules (inline
/// expressions and local files), one live matcher per remote file, and the
/// matchers of referenced providers.
pub struct RuleSet<S: SetKind> {
    group: Arc<MatcherGroup<S::Key>>,
    sources: Vec<Arc<RemoteSource<S>>>,
}

pub type DomainSet = RuleSet<DomainKind>;
pub type IpSet = RuleSet<IpKind>;

impl<S: SetKind> RuleSet<S> {
    /// Builds the set. Remote files are fully provisioned before this returns;
    /// their refreshers are spawned on the registry's task tracker.
    pub async fn new(args: &SetArgs, registry: &Registry) -> Result<Self, SetError> {
        // 1. Static rules
        let mut local = S::Builder::default();
        load_exps_and_files(&args.exps, &args.files, &mut local).await?;

        // 2. References, resolved up front so a bad tag fails before any download
        let references = args
            .sets
            .iter()
            .map(|tag| registry.resolve::<S>(tag))
            .collect::<Result<Vec<_>, _>>()?;

        // 3. Remote files
        for rf in &args.remote_files {
            validate_url(rf)?;
        }
        let mut sources = Vec::with_capacity(args.remote_files.len());
        for rf in &args.remote_files {
            let source = RemoteSource::<S>::provision(rf, registry.fetcher())
                .await
                .map_err(|source| SetError::Remote {
                    url: rf.url.clone(),
                    source,
                })?;
            sources.push(Arc::new(source));
        }

        // 4. Compose
        let mut group = MatcherGroup::default();
        let (local, local_rules) = S::build(local);
        if local_rules > 0 {
            group.push(local);
        }
        for source in &sources {
            group.push(source.matcher());
        }
        for matcher in references {
            group.push(matcher);
        }

        // Only start refreshing once the whole set is ready.
        for source in &sources {
            spawn_refresher(Arc::clone(source), registry.token(), registry.tracker());
        }

        info!(
            "Built {} with {} static rules, {} remote files, {} references",
            S::PLUGIN_TYPE,
            local_rules,
            sources.len(),
            args.sets.len()
        );

        Ok(Self {
            group: Arc::new(group),
            sources,
        })
    }

    pub fn is_match(&self, key: &S::Key) -> bool {
        self.group.is_match(key)
    }

    pub fn matcher(&self) -> Arc<dyn Matcher<S::Key>> {
        self.group.clone()
    }

    pub fn remote_sources(&self) -> &[Arc<RemoteSource<S>>] {
        &self.sources
    }

    /// Number of composed components.
    pub fn components(&self) -> usize {
        self.group.len()
    }
}

fn validate_url(rf: &RemoteFile) -> Result<(), SetError> {
    let invalid = |reason: String| SetError::InvalidUrl {
        url: rf.url.clone(),
        reason,
    };
    let url = Url::parse(&rf.url).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme {other}"))),
    }
}

impl Plugin for DomainSet {
    fn plugin_type(&self) -> &'static str {
        DomainKind::PLUGIN_TYPE
    }

    fn as_domain_provider(&self) -> Option<&dyn DomainMatcherProvider> {
        Some(self)
    }
}

impl DomainMatcherProvider for DomainSet {
    fn domain_matcher(&self) -> Arc<dyn Matcher<str>> {
        self.matcher()
    }
}

impl Plugin for IpSet {
    fn plugin_type(&self) -> &'static str {
        IpKind::PLUGIN_TYPE
    }

    fn as_ip_provider(&self) -> Option<&dyn IpMatcherProvider> {
        Some(self)
    }
}

impl IpMatcherProvider for IpSet {
    fn ip_matcher(&self) -> Arc<dyn Matcher<IpAddr>> {
        self.matcher()
    }
}
