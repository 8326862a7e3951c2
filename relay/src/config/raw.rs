// Copyright 2026 The Relay Project
// SPDX-License-Identifier: Apache-2.0

// Raw YAML deserialization types (internal).
// Every field is optional; defaults and interpolation are applied by the
// loader when building the public `Config`.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default)]
    pub upstream: RawUpstream,
    #[serde(default)]
    pub credentials: RawCredentials,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawUpstream {
    pub base_url: Option<String>,
    pub beta: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCredentials {
    pub api_key_var: Option<String>,
    pub assistant_id_var: Option<String>,
    pub default_assistant_id: Option<String>,
}
