// Copyright 2026 The Relay Project
// SPDX-License-Identifier: Apache-2.0

pub mod config;
pub mod server;
pub mod stream;
pub mod upstream;
