//! Chat room notifier
//!
//! Acts as a bot on a Matrix-style homeserver and posts a notice to a
//! configured room on every open/closed transition. Sessions are
//! cached per host and reused across restarts; a cached session that
//! fails verification falls back to a fresh password login. Any
//! failure on the setup path soft-disables the host.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::store::StatusStore;

use super::error::{CredentialError, DeliveryError};
use super::notifier::{Notifier, NotifierContext, PluginDescriptor, ResolvedConfig};
use super::session_cache::SessionCache;

pub const PLUGIN_NAME: &str = "chatroom";

/// Device name presented to the homeserver at login
const DEVICE_NAME: &str = "spacestatus-server";

pub fn descriptor() -> PluginDescriptor {
    PluginDescriptor {
        name: PLUGIN_NAME,
        defaults: None,
        required: &["homeserver", "username", "password", "room"],
        build: |config, ctx| Box::pin(ChatRoomNotifier::connect(config, ctx)),
    }
}

#[derive(Debug, Deserialize)]
struct HostConfig {
    homeserver: String,
    username: String,
    password: String,
    room: String,
    /// Session cache file override; defaults to the shared cache dir
    sessioncache: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    user_id: String,
    device_id: String,
    access_token: String,
}

/// Authenticated room client for one host
struct RoomClient {
    client: Client,
    homeserver: String,
    room: String,
    access_token: String,
}

pub struct ChatRoomNotifier {
    hosts: HashMap<String, RoomClient>,
    configured: HashSet<String>,
    store: Arc<StatusStore>,
}

impl ChatRoomNotifier {
    async fn connect(config: ResolvedConfig, ctx: NotifierContext) -> Arc<dyn Notifier> {
        let mut hosts = HashMap::new();

        for (host, value) in config {
            let cfg: HostConfig = match value.try_into() {
                Ok(cfg) => cfg,
                Err(e) => {
                    error!(%host, error = %e, "invalid chatroom configuration, host disabled");
                    continue;
                }
            };

            let cache_path = cfg
                .sessioncache
                .clone()
                .unwrap_or_else(|| ctx.cache_dir.join(format!("chatroom-{host}.json")));

            match Self::connect_host(&host, &cfg, &cache_path, &ctx.store).await {
                Ok(room) => {
                    hosts.insert(host, room);
                }
                Err(e) => {
                    warn!(%host, error = %e, "chat room setup failed, host disabled");
                }
            }
        }

        let configured = hosts.keys().cloned().collect();
        Arc::new(Self {
            hosts,
            configured,
            store: ctx.store,
        })
    }

    /// Establish a verified room client for one host.
    ///
    /// A cached session for the same server and account is tried first;
    /// its verification failing only falls back to a fresh password
    /// login. The welcome message doubles as session verification.
    async fn connect_host(
        host: &str,
        cfg: &HostConfig,
        cache_path: &Path,
        store: &Arc<StatusStore>,
    ) -> Result<RoomClient, CredentialError> {
        let client = Client::new();
        let homeserver = cfg.homeserver.trim_end_matches('/').to_string();

        if let Some(cache) = SessionCache::load(cache_path).await
            && cache.matches(&homeserver, &cfg.username)
        {
            info!(host, "trying cached chat session");
            let room = RoomClient {
                client: client.clone(),
                homeserver: homeserver.clone(),
                room: cfg.room.clone(),
                access_token: cache.credential,
            };
            match Self::send_welcome(&room, host, store).await {
                Ok(()) => return Ok(room),
                Err(e) => warn!(host, error = %e, "cached chat session is not valid"),
            }
        }

        info!(host, "authenticating to homeserver");
        let login = Self::login(&client, &homeserver, cfg).await?;
        info!(host, user_id = %login.user_id, device_id = %login.device_id, "authenticated");

        let cache = SessionCache {
            server: homeserver.clone(),
            identity: cfg.username.clone(),
            device_id: login.device_id,
            credential: login.access_token.clone(),
        };
        if let Err(e) = cache.save(cache_path).await {
            warn!(host, error = %e, "failed to save chat session cache");
        } else {
            info!(host, "chat session cached");
        }

        let room = RoomClient {
            client,
            homeserver,
            room: cfg.room.clone(),
            access_token: login.access_token,
        };
        Self::send_welcome(&room, host, store)
            .await
            .map_err(|e| CredentialError(format!("welcome message failed: {e}")))?;
        Ok(room)
    }

    async fn login(
        client: &Client,
        homeserver: &str,
        cfg: &HostConfig,
    ) -> Result<LoginResponse, CredentialError> {
        let response = client
            .post(format!("{homeserver}/_matrix/client/v3/login"))
            .json(&json!({
                "type": "m.login.password",
                "identifier": { "type": "m.id.user", "user": cfg.username },
                "password": cfg.password,
                "initial_device_display_name": DEVICE_NAME,
            }))
            .send()
            .await
            .map_err(|e| CredentialError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CredentialError(format!(
                "login rejected with status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| CredentialError(e.to_string()))
    }

    /// Join the room and announce the current status. Succeeding proves
    /// the session is usable.
    async fn send_welcome(
        room: &RoomClient,
        host: &str,
        store: &Arc<StatusStore>,
    ) -> Result<(), DeliveryError> {
        room.join().await?;

        let space = store
            .display_name(host)
            .await
            .unwrap_or_else(|| host.to_string());
        let state = match store.open_state(host).await {
            Some(true) => "OPEN",
            Some(false) | None => "CLOSED",
        };
        let phrase = format!("Status service started for {space}. Current status is {state}.");

        room.send_notice(&phrase).await?;
        info!(host, "chat welcome message sent");
        Ok(())
    }
}

impl RoomClient {
    async fn join(&self) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(format!(
                "{}/_matrix/client/v3/join/{}",
                self.homeserver, self.room
            ))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(DeliveryError::from_reqwest)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Api(format!(
                "join failed with status {}",
                response.status()
            )))
        }
    }

    async fn send_notice(&self, body: &str) -> Result<(), DeliveryError> {
        let txn_id = Uuid::new_v4();
        let response = self
            .client
            .put(format!(
                "{}/_matrix/client/v3/rooms/{}/send/m.room.message/{txn_id}",
                self.homeserver, self.room
            ))
            .bearer_auth(&self.access_token)
            .json(&json!({ "msgtype": "m.notice", "body": body }))
            .send()
            .await
            .map_err(DeliveryError::from_reqwest)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Api(format!(
                "send failed with status {}",
                response.status()
            )))
        }
    }
}

#[async_trait]
impl Notifier for ChatRoomNotifier {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn configured_hosts(&self) -> &HashSet<String> {
        &self.configured
    }

    async fn on_state_change(&self, host: &str, open: bool) {
        let Some(room) = self.hosts.get(host) else {
            return;
        };

        let space = self
            .store
            .display_name(host)
            .await
            .unwrap_or_else(|| host.to_string());
        let phrase = format!("{space} is {}.", if open { "open" } else { "closed" });

        match room.send_notice(&phrase).await {
            Ok(()) => info!(host, %phrase, "chat room notice sent"),
            Err(e) => error!(host, error = %e, "sending chat room notice failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toml::Value;

    #[test]
    fn test_descriptor_shape() {
        let descriptor = descriptor();
        assert_eq!(descriptor.name, "chatroom");
        assert!(descriptor.defaults.is_none());
        assert_eq!(
            descriptor.required,
            &["homeserver", "username", "password", "room"]
        );
    }

    #[test]
    fn test_host_config_parses() {
        let value = Value::Table(toml::toml! {
            enabled = true
            homeserver = "https://chat.example.org"
            username = "@status:example.org"
            password = "hunter2"
            room = "!room:example.org"
        });
        let cfg: HostConfig = value.try_into().unwrap();

        assert_eq!(cfg.room, "!room:example.org");
        assert!(cfg.sessioncache.is_none());
    }

    #[test]
    fn test_host_config_sessioncache_override() {
        let value = Value::Table(toml::toml! {
            homeserver = "https://chat.example.org"
            username = "@status:example.org"
            password = "hunter2"
            room = "!room:example.org"
            sessioncache = "/var/cache/chatroom-h1.json"
        });
        let cfg: HostConfig = value.try_into().unwrap();
        assert_eq!(
            cfg.sessioncache.as_deref(),
            Some(Path::new("/var/cache/chatroom-h1.json"))
        );
    }

    #[test]
    fn test_login_response_parses() {
        let login: LoginResponse = serde_json::from_str(
            r#"{
                "user_id": "@status:example.org",
                "device_id": "DEVICE1",
                "access_token": "syt_secret",
                "home_server": "example.org"
            }"#,
        )
        .unwrap();
        assert_eq!(login.device_id, "DEVICE1");
        assert_eq!(login.access_token, "syt_secret");
    }
}
