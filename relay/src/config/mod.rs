// Copyright 2026 The Relay Project
// SPDX-License-Identifier: Apache-2.0

// Relay settings
//
// Loads the optional YAML settings file, resolves `${VAR}` interpolation,
// applies defaults, and validates. Credentials are not part of the loaded
// config; only the names of the variables holding them are, and those are
// read per request.

mod defaults;
mod error;
mod interpolation;
mod loader;
mod raw;
mod source;
mod types;

pub use defaults::{
    DEFAULT_API_KEY_VAR, DEFAULT_ASSISTANT_ID, DEFAULT_ASSISTANT_ID_VAR, DEFAULT_BASE_URL,
    DEFAULT_BETA,
};
pub use error::ConfigError;
pub use interpolation::resolve_variables;
pub use loader::load_config;
pub use source::{ConfigSource, Environment, FileSource, ProcessEnv, StaticEnv, StringSource};
pub use types::{Config, CredentialSettings, UpstreamSettings};
