// Copyright 2026 The Relay Project
// SPDX-License-Identifier: Apache-2.0

use super::error::ConfigError;
use super::interpolation::resolve_variables;
use super::raw;
use super::source::{ConfigSource, Environment};
use super::types::{Config, CredentialSettings, UpstreamSettings};

/// Load and validate relay settings from the given source.
///
/// Steps:
/// 1. Read the YAML document (an empty document means all defaults)
/// 2. Parse into raw deserialization types, rejecting unknown keys
/// 3. Resolve `${VAR}` interpolation in string fields
/// 4. Apply defaults and validate
pub fn load_config(source: &dyn ConfigSource, env: &dyn Environment) -> Result<Config, ConfigError> {
    let raw_yaml = source.load()?;

    let raw: raw::RawConfig = if raw_yaml.trim().is_empty() {
        raw::RawConfig::default()
    } else {
        serde_yaml::from_str(&raw_yaml)?
    };

    let upstream = build_upstream(raw.upstream, env)?;
    let credentials = build_credentials(raw.credentials, env)?;

    Ok(Config {
        upstream,
        credentials,
    })
}

fn build_upstream(raw: raw::RawUpstream, env: &dyn Environment) -> Result<UpstreamSettings, ConfigError> {
    let defaults = UpstreamSettings::default();

    let base_url = match raw.base_url {
        Some(url) => resolve_variables(&url, env)?,
        None => defaults.base_url,
    };
    let base_url = base_url.trim_end_matches('/').to_string();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::Invalid {
            field: "upstream.base_url",
            reason: format!("expected an http(s) URL, got \"{base_url}\""),
        });
    }

    let beta = match raw.beta {
        Some(beta) => resolve_variables(&beta, env)?,
        None => defaults.beta,
    };
    non_empty("upstream.beta", &beta)?;

    if raw.timeout_ms == Some(0) {
        return Err(ConfigError::Invalid {
            field: "upstream.timeout_ms",
            reason: "must be greater than zero".to_string(),
        });
    }

    Ok(UpstreamSettings {
        base_url,
        beta,
        timeout_ms: raw.timeout_ms,
    })
}

fn build_credentials(
    raw: raw::RawCredentials,
    env: &dyn Environment,
) -> Result<CredentialSettings, ConfigError> {
    let defaults = CredentialSettings::default();

    let api_key_var = raw.api_key_var.unwrap_or(defaults.api_key_var);
    non_empty("credentials.api_key_var", &api_key_var)?;

    let assistant_id_var = raw.assistant_id_var.unwrap_or(defaults.assistant_id_var);
    non_empty("credentials.assistant_id_var", &assistant_id_var)?;

    let default_assistant_id = match raw.default_assistant_id {
        Some(id) => resolve_variables(&id, env)?,
        None => defaults.default_assistant_id,
    };
    non_empty("credentials.default_assistant_id", &default_assistant_id)?;

    Ok(CredentialSettings {
        api_key_var,
        assistant_id_var,
        default_assistant_id,
    })
}

fn non_empty(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}
