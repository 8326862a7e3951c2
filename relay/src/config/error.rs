// Copyright 2026 The Relay Project
// SPDX-License-Identifier: Apache-2.0

/// Errors raised while loading relay settings. All of them are fatal at
/// startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read settings: {0}")]
    Read(#[from] std::io::Error),

    #[error("settings are not valid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("settings reference ${{{name}}}, which is not set")]
    UnsetVariable { name: String },
}
