//! Forward proxy front end.
//!
//! Requests arrive as `GET /<target-url>` or `POST /<target-url>`. GETs are
//! checked against the deny list; POST form bodies go through DLP inspection.
//! Allowed requests are fetched upstream and relayed, denied ones get a
//! violation page.

pub mod handler;
pub mod response;
pub mod upstream;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::dlp::patterns::PatternSet;
use crate::error::Result;
use crate::policy::config::{AppConfig, PolicyConfig, ProxyConfig};

/// Read-only state shared by every connection.
pub struct ProxyState {
    pub config: ProxyConfig,
    pub policy: PolicyConfig,
    pub rules: PatternSet,
    pub client: reqwest::Client,
}

impl ProxyState {
    pub fn new(config: ProxyConfig, policy: PolicyConfig, rules: PatternSet) -> Result<Self> {
        let client = upstream::build_client(config.upstream_timeout())?;
        Ok(Self {
            config,
            policy,
            rules,
            client,
        })
    }
}

pub struct ProxyServer {
    config: ProxyConfig,
    policy: PolicyConfig,
    rules: PatternSet,
}

impl ProxyServer {
    /// A server with an empty deny list and no rules.
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config,
            policy: PolicyConfig::default(),
            rules: PatternSet::default(),
        }
    }

    /// Build a server from a loaded configuration, compiling its rules.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(config.proxy.clone())
            .with_policy(config.policy.clone())
            .with_rules(config.compile_rules()?))
    }

    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_rules(mut self, rules: PatternSet) -> Self {
        self.rules = rules;
        self
    }

    /// Start the proxy server and return the actual bound address.
    pub async fn start(self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(&self.config.listen).await?;
        let local_addr = listener.local_addr()?;
        info!(
            "dlpgate proxy listening on {} ({} rules, {} deny-list entries)",
            local_addr,
            self.rules.len(),
            self.policy.deny_list.len()
        );

        let state = Arc::new(ProxyState::new(self.config, self.policy, self.rules)?);
        tokio::spawn(async move {
            handler::accept_loop(listener, state).await;
        });

        Ok(local_addr)
    }
}
