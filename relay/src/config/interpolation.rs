// Copyright 2026 The Relay Project
// SPDX-License-Identifier: Apache-2.0

use super::error::ConfigError;
use super::source::Environment;

/// Resolves `${VAR_NAME}` references in a string from the given environment.
///
/// An unterminated or empty reference is kept literally. A reference to an
/// unset variable is an error.
pub fn resolve_variables(input: &str, env: &dyn Environment) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        match after.find('}') {
            Some(0) | None => {
                result.push_str("${");
                rest = after;
            }
            Some(end) => {
                let name = &after[..end];
                let value = env.var(name).ok_or_else(|| ConfigError::UnsetVariable {
                    name: name.to_string(),
                })?;
                result.push_str(&value);
                rest = &after[end + 1..];
            }
        }
    }

    result.push_str(rest);
    Ok(result)
}
