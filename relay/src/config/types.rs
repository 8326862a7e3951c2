// Copyright 2026 The Relay Project
// SPDX-License-Identifier: Apache-2.0

use super::defaults::{
    DEFAULT_API_KEY_VAR, DEFAULT_ASSISTANT_ID, DEFAULT_ASSISTANT_ID_VAR, DEFAULT_BASE_URL,
    DEFAULT_BETA,
};

/// Validated relay settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Config {
    pub upstream: UpstreamSettings,
    pub credentials: CredentialSettings,
}

/// How to reach the Assistants API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamSettings {
    /// API root, trailing slash removed.
    pub base_url: String,
    /// `OpenAI-Beta` header value.
    pub beta: String,
    /// Timeout for the thread and message calls. The streaming run call is
    /// never timed out.
    pub timeout_ms: Option<u64>,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            beta: DEFAULT_BETA.to_string(),
            timeout_ms: None,
        }
    }
}

/// Names of the environment variables read on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSettings {
    pub api_key_var: String,
    pub assistant_id_var: String,
    pub default_assistant_id: String,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            api_key_var: DEFAULT_API_KEY_VAR.to_string(),
            assistant_id_var: DEFAULT_ASSISTANT_ID_VAR.to_string(),
            default_assistant_id: DEFAULT_ASSISTANT_ID.to_string(),
        }
    }
}
