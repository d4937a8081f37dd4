// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Observability sink trait for routing-decision records.

use async_trait::async_trait;

use crate::error::NadzorError;
use crate::traits::adapter::PluginAdapter;
use crate::types::RoutingRecord;

/// Sink for structured routing-decision records.
///
/// Callers treat delivery as fire-and-forget: a failing sink must never
/// block or fail the routing decision itself.
#[async_trait]
pub trait RoutingSink: PluginAdapter {
    /// Records a routing decision.
    async fn record(&self, record: RoutingRecord) -> Result<(), NadzorError>;
}
