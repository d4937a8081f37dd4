// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation history persistence for the StroiNadzor agent.
//!
//! Provides [`SqliteContextStore`], an append-only per-user conversation log
//! on SQLite. History is only appended after a request completes, in
//! completion order; the executor reads a bounded oldest-first window to
//! build prompts.

pub mod store;

pub use store::SqliteContextStore;
