// Copyright 2026 The Relay Project
// SPDX-License-Identifier: Apache-2.0

/// Assistants API root, without a trailing slash.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Value of the `OpenAI-Beta` header sent on every upstream call.
pub const DEFAULT_BETA: &str = "assistants=v1";

pub const DEFAULT_API_KEY_VAR: &str = "OPENAI_API_KEY";

pub const DEFAULT_ASSISTANT_ID_VAR: &str = "ASSISTANT_ID";

/// Used when the assistant id variable is unset.
pub const DEFAULT_ASSISTANT_ID: &str = "asst_abc123xyz";
