//! Microblog notifier
//!
//! Posts a wordlist-generated phrase to a Mastodon-compatible API on
//! every open/closed transition. Credentials are verified once at
//! construction; hosts that fail verification are dropped from the
//! configured set. Connection failures are retried a fixed number of
//! times, API rejections never are.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use toml::Value;
use tracing::{error, info, warn};

use super::error::{CredentialError, DeliveryError};
use super::notifier::{Notifier, NotifierContext, PluginDescriptor, ResolvedConfig};
use super::phrase::{Wordlist, build_phrase};

pub const PLUGIN_NAME: &str = "microblog";

/// Upper bound on delivery attempts for transient failures
const MAX_ATTEMPTS: u32 = 3;

pub fn descriptor() -> PluginDescriptor {
    PluginDescriptor {
        name: PLUGIN_NAME,
        defaults: Some(Value::Table(toml::toml! {
            timeout = 30

            [wordlist]
            name = ["The space"]
            verb = ["is"]

            [wordlist.state]
            open = ["open"]
            closed = ["closed"]

            [wordlist.adjective]
            open = []
            closed = []
        })),
        required: &["base_url", "access_token"],
        build: |config, ctx| Box::pin(MicroblogNotifier::connect(config, ctx)),
    }
}

#[derive(Debug, Deserialize)]
struct HostConfig {
    base_url: String,
    access_token: String,
    #[serde(default)]
    wordlist: Wordlist,
    #[serde(default = "default_timeout")]
    timeout: u64,
}

fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize)]
struct Account {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    username: String,
}

/// Verified API client for one host
struct HostPoster {
    client: Client,
    base_url: String,
    access_token: String,
    wordlist: Wordlist,
}

pub struct MicroblogNotifier {
    hosts: HashMap<String, HostPoster>,
    configured: HashSet<String>,
}

impl MicroblogNotifier {
    async fn connect(config: ResolvedConfig, _ctx: NotifierContext) -> Arc<dyn Notifier> {
        let mut hosts = HashMap::new();

        for (host, value) in config {
            let cfg: HostConfig = match value.try_into() {
                Ok(cfg) => cfg,
                Err(e) => {
                    error!(%host, error = %e, "invalid microblog configuration, host disabled");
                    continue;
                }
            };

            let client = match Client::builder()
                .timeout(Duration::from_secs(cfg.timeout))
                .build()
            {
                Ok(client) => client,
                Err(e) => {
                    error!(%host, error = %e, "failed to build http client, host disabled");
                    continue;
                }
            };

            let poster = HostPoster {
                client,
                base_url: cfg.base_url.trim_end_matches('/').to_string(),
                access_token: cfg.access_token,
                wordlist: cfg.wordlist,
            };

            match poster.verify_credentials().await {
                Ok(account) => {
                    info!(%host, account = %account, "microblog credentials verified");
                    hosts.insert(host, poster);
                }
                Err(e) => {
                    warn!(%host, error = %e, "microblog credentials are not valid, host disabled");
                }
            }
        }

        let configured = hosts.keys().cloned().collect();
        Arc::new(Self { hosts, configured })
    }
}

impl HostPoster {
    async fn verify_credentials(&self) -> Result<String, CredentialError> {
        let response = self
            .client
            .get(format!("{}/api/v1/accounts/verify_credentials", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| CredentialError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CredentialError(format!("status {}", response.status())));
        }

        let account: Account = response
            .json()
            .await
            .map_err(|e| CredentialError(e.to_string()))?;
        Ok(if account.display_name.is_empty() {
            account.username
        } else {
            account.display_name
        })
    }

    async fn post_status(&self, phrase: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(format!("{}/api/v1/statuses", self.base_url))
            .bearer_auth(&self.access_token)
            .form(&[("status", phrase), ("visibility", "unlisted")])
            .send()
            .await
            .map_err(DeliveryError::from_reqwest)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Api(format!("status {}", response.status())))
        }
    }
}

#[async_trait]
impl Notifier for MicroblogNotifier {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn configured_hosts(&self) -> &HashSet<String> {
        &self.configured
    }

    async fn on_state_change(&self, host: &str, open: bool) {
        let Some(poster) = self.hosts.get(host) else {
            return;
        };

        let phrase = {
            let mut rng = rand::thread_rng();
            build_phrase(&poster.wordlist, open, &mut rng)
        };
        let Some(phrase) = phrase else {
            warn!(host, "microblog wordlist is incomplete, nothing to post");
            return;
        };

        for attempt in 1..=MAX_ATTEMPTS {
            match poster.post_status(&phrase).await {
                Ok(()) => {
                    info!(host, %phrase, "microblog status posted");
                    return;
                }
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    warn!(host, error = %e, attempt, "microblog connection failed, retrying");
                }
                Err(e) => {
                    error!(host, error = %e, "sending microblog status failed");
                    return;
                }
            }
        }
    }
}
