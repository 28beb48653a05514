//! Layered per-host configuration resolution for plugins
//!
//! Each plugin's effective configuration is built per host from three
//! layers: plugin defaults, the global plugin fragment, and the host's
//! override fragment. Host overrides win over the global fragment,
//! which wins over defaults. Hosts without `enabled = true` in their
//! merged fragment do not participate at all.

use std::collections::BTreeMap;

use thiserror::Error;
use toml::Value;
use tracing::debug;

use super::merge::deep_merge;

/// One required key that did not resolve for one host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingKey {
    pub host: String,
    pub key: String,
}

/// A required configuration key is missing for at least one host.
///
/// Fatal at registry-build time: the affected plugin is not usable with
/// partial configuration, and startup is aborted.
#[derive(Debug, Error)]
#[error("configuration for plugin {plugin} is not valid: {}", render_missing(.missing))]
pub struct ConfigValidationError {
    pub plugin: String,
    pub missing: Vec<MissingKey>,
}

fn render_missing(missing: &[MissingKey]) -> String {
    missing
        .iter()
        .map(|m| format!("[{} / {}] missing", m.host, m.key))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve the effective per-host configuration for one plugin.
///
/// `per_host` must contain an entry for every configured host (an empty
/// table when the host carries no fragment for this plugin). Hosts
/// whose merged fragment lacks `enabled = true` are dropped silently.
/// Every surviving host is checked against every required dotted key
/// path; misses are collected across all hosts before failing, so the
/// error names each offending (host, key) pair.
pub fn resolve(
    plugin: &str,
    defaults: Option<&Value>,
    global: &Value,
    per_host: &BTreeMap<String, Value>,
    required: &[&str],
) -> Result<BTreeMap<String, Value>, ConfigValidationError> {
    let mut resolved = BTreeMap::new();

    for (host, fragment) in per_host {
        let merged = deep_merge(global.clone(), fragment.clone());

        let enabled = merged
            .get("enabled")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !enabled {
            debug!(%host, plugin, "plugin not enabled for host, skipping");
            continue;
        }

        let layered = match defaults {
            Some(defaults) => deep_merge(defaults.clone(), merged),
            None => merged,
        };
        resolved.insert(host.clone(), layered);
    }

    let mut missing = Vec::new();
    for (host, config) in &resolved {
        for key in required {
            if lookup_path(config, key).is_none() {
                missing.push(MissingKey {
                    host: host.clone(),
                    key: (*key).to_string(),
                });
            }
        }
    }

    if missing.is_empty() {
        Ok(resolved)
    } else {
        Err(ConfigValidationError {
            plugin: plugin.to_string(),
            missing,
        })
    }
}

/// Walk a dotted key path (`"access.token"`) through nested tables.
fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |value, segment| value.get(segment))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(content: &str) -> Value {
        Value::Table(toml::from_str(content).unwrap())
    }

    fn empty() -> Value {
        Value::Table(toml::Table::new())
    }

    fn hosts(entries: &[(&str, &str)]) -> BTreeMap<String, Value> {
        entries
            .iter()
            .map(|(host, fragment)| (host.to_string(), table(fragment)))
            .collect()
    }

    #[test]
    fn test_host_without_enabled_is_dropped() {
        let per_host = hosts(&[("h1", "token = \"t\"")]);
        let resolved = resolve("test", None, &empty(), &per_host, &[]).unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_enabled_false_is_dropped() {
        let per_host = hosts(&[("h1", "enabled = false\ntoken = \"t\"")]);
        let resolved = resolve("test", None, &empty(), &per_host, &[]).unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_enabled_via_global_fragment() {
        // A host absent from the plugin's overrides still participates
        // when the global fragment enables it.
        let per_host = hosts(&[("h1", "")]);
        let global = table("enabled = true\ntoken = \"global\"");
        let resolved = resolve("test", None, &global, &per_host, &[]).unwrap();

        let config = resolved.get("h1").unwrap();
        assert_eq!(config.get("token").and_then(Value::as_str), Some("global"));
    }

    #[test]
    fn test_host_override_wins_over_global() {
        let per_host = hosts(&[("h1", "enabled = true\ntoken = \"host\"")]);
        let global = table("token = \"global\"");
        let resolved = resolve("test", None, &global, &per_host, &[]).unwrap();

        let config = resolved.get("h1").unwrap();
        assert_eq!(config.get("token").and_then(Value::as_str), Some("host"));
    }

    #[test]
    fn test_defaults_lose_to_host_values() {
        let defaults = table("[wordlist]\nverb = [\"is\"]");
        let per_host = hosts(&[("h1", "enabled = true\n[wordlist]\nverb = [\"was\"]")]);
        let resolved = resolve("test", Some(&defaults), &empty(), &per_host, &[]).unwrap();

        let verbs = resolved
            .get("h1")
            .and_then(|c| c.get("wordlist"))
            .and_then(|w| w.get("verb"))
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(verbs[0].as_str(), Some("was"));
    }

    #[test]
    fn test_defaults_fill_absent_keys() {
        let defaults = table("timeout = 30");
        let per_host = hosts(&[("h1", "enabled = true")]);
        let resolved = resolve("test", Some(&defaults), &empty(), &per_host, &[]).unwrap();

        let config = resolved.get("h1").unwrap();
        assert_eq!(config.get("timeout").and_then(Value::as_integer), Some(30));
    }

    #[test]
    fn test_no_required_keys_always_succeeds() {
        let per_host = hosts(&[("h1", "enabled = true")]);
        assert!(resolve("test", None, &empty(), &per_host, &[]).is_ok());
    }

    #[test]
    fn test_missing_required_key_fails() {
        let per_host = hosts(&[("h1", "enabled = true")]);
        let err = resolve("test", None, &empty(), &per_host, &["token"]).unwrap_err();

        assert_eq!(err.plugin, "test");
        assert_eq!(err.missing.len(), 1);
        assert_eq!(err.missing[0].host, "h1");
        assert_eq!(err.missing[0].key, "token");

        let message = err.to_string();
        assert!(message.contains("test"));
        assert!(message.contains("h1"));
        assert!(message.contains("token"));
    }

    #[test]
    fn test_misses_collected_across_hosts_and_keys() {
        let per_host = hosts(&[
            ("h1", "enabled = true\n[access]\ntoken = \"t\""),
            ("h2", "enabled = true"),
        ]);
        let err = resolve(
            "test",
            None,
            &empty(),
            &per_host,
            &["access.token", "access.secret"],
        )
        .unwrap_err();

        // h1 misses only the secret, h2 misses both.
        assert_eq!(err.missing.len(), 3);
        assert!(err.missing.contains(&MissingKey {
            host: "h1".into(),
            key: "access.secret".into()
        }));
        assert!(err.missing.contains(&MissingKey {
            host: "h2".into(),
            key: "access.token".into()
        }));
    }

    #[test]
    fn test_two_segment_path_resolves() {
        let per_host = hosts(&[("h1", "enabled = true\n[access]\ntoken = \"t\"")]);
        assert!(resolve("test", None, &empty(), &per_host, &["access.token"]).is_ok());
    }

    #[test]
    fn test_disabled_host_is_not_validated() {
        // Required keys only apply to hosts that survive the enabled
        // filter.
        let per_host = hosts(&[("h1", "enabled = false")]);
        assert!(resolve("test", None, &empty(), &per_host, &["token"]).is_ok());
    }
}
