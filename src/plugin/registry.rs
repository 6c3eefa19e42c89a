use super::kind::{DomainKind, IpKind, SetKind};
use super::set::{DomainSet, IpSet};
use super::Plugin;
use crate::config::{Config, PluginType, SetArgs};
use crate::engine::Matcher;
use crate::error::{ProviderError, SetError};
use crate::remote::{HttpFetcher, RuleFetcher};
use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info};

/// Plugins by tag, plus what sets need while being built: the fetcher for
/// remote files and the token/tracker owning their refresh tasks.
pub struct Registry {
    plugins: FxHashMap<String, Arc<dyn Plugin>>,
    fetcher: Arc<dyn RuleFetcher>,
    token: CancellationToken,
    tracker: TaskTracker,
}

impl Registry {
    pub fn new(fetcher: Arc<dyn RuleFetcher>) -> Self {
        Self {
            plugins: FxHashMap::default(),
            fetcher,
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Builds every configured plugin in declaration order.
    ///
    /// On failure the refreshers of already built sets are cancelled.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.fetch.user_agent)
            .context("Failed to build HTTP client")?;
        let mut registry = Self::new(Arc::new(fetcher));

        for plugin in &config.plugins {
            let res = match plugin.plugin_type {
                PluginType::DomainSet => registry.add_domain_set(&plugin.tag, &plugin.args).await,
                PluginType::IpSet => registry.add_ip_set(&plugin.tag, &plugin.args).await,
            };
            if let Err(e) = res {
                error!("Failed to init plugin {}: {}", plugin.tag, e);
                registry.shutdown().await;
                return Err(e).with_context(|| format!("failed to init plugin {}", plugin.tag));
            }
        }

        info!("Initialized {} plugins", registry.len());
        Ok(registry)
    }

    pub async fn add_domain_set(&mut self, tag: &str, args: &SetArgs) -> Result<(), SetError> {
        self.ensure_free(tag)?;
        let set = DomainSet::new(args, self).await?;
        self.plugins.insert(tag.to_string(), Arc::new(set));
        Ok(())
    }

    pub async fn add_ip_set(&mut self, tag: &str, args: &SetArgs) -> Result<(), SetError> {
        self.ensure_free(tag)?;
        let set = IpSet::new(args, self).await?;
        self.plugins.insert(tag.to_string(), Arc::new(set));
        Ok(())
    }

    /// Registers an already built plugin.
    pub fn insert(&mut self, tag: &str, plugin: Arc<dyn Plugin>) -> Result<(), SetError> {
        self.ensure_free(tag)?;
        self.plugins.insert(tag.to_string(), plugin);
        Ok(())
    }

    fn ensure_free(&self, tag: &str) -> Result<(), SetError> {
        if self.plugins.contains_key(tag) {
            return Err(SetError::DuplicateTag(tag.to_string()));
        }
        Ok(())
    }

    pub fn get(&self, tag: &str) -> Option<&Arc<dyn Plugin>> {
        self.plugins.get(tag)
    }

    /// Looks up `tag` and extracts its matcher for the key type of `S`.
    pub fn resolve<S: SetKind>(&self, tag: &str) -> Result<Arc<dyn Matcher<S::Key>>, ProviderError> {
        let plugin = self.plugins.get(tag).ok_or_else(|| ProviderError::NotFound {
            tag: tag.to_string(),
        })?;
        S::provided_by(plugin.as_ref()).ok_or_else(|| ProviderError::MissingCapability {
            tag: tag.to_string(),
            capability: S::CAPABILITY,
        })
    }

    pub fn domain_matcher(&self, tag: &str) -> Result<Arc<dyn Matcher<str>>, ProviderError> {
        self.resolve::<DomainKind>(tag)
    }

    pub fn ip_matcher(&self, tag: &str) -> Result<Arc<dyn Matcher<IpAddr>>, ProviderError> {
        self.resolve::<IpKind>(tag)
    }

    /// Answers one lookup against the plugin registered as `tag`. IP sets
    /// parse `key` as an address.
    pub fn check(&self, tag: &str, key: &str) -> Result<bool> {
        let plugin = self
            .plugins
            .get(tag)
            .ok_or_else(|| ProviderError::NotFound {
                tag: tag.to_string(),
            })?;
        if let Some(provider) = plugin.as_domain_provider() {
            return Ok(provider.domain_matcher().is_match(key));
        }
        if let Some(provider) = plugin.as_ip_provider() {
            let addr: IpAddr = key
                .parse()
                .with_context(|| format!("invalid ip address {key}"))?;
            return Ok(provider.ip_matcher().is_match(&addr));
        }
        anyhow::bail!("{} ({}) provides no matcher", tag, plugin.plugin_type())
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn fetcher(&self) -> Arc<dyn RuleFetcher> {
        Arc::clone(&self.fetcher)
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Stops all refreshers and waits for them to exit.
    pub async fn shutdown(&self) {
        self.token.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("All refresh tasks stopped.");
    }
}
