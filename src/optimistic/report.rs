//! Content reports, applied optimistically.
//!
//! Reporting hides the target locally straight away. If the server refuses
//! the report the target becomes visible again.

use async_trait::async_trait;

use super::{ActionOutcome, OptimisticModel, Reconciler};
use crate::auth::ApiClient;
use crate::error::TetherResult;
use crate::models::{ReportReason, ReportTarget};
use crate::traits::RemoteMutation;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportView {
    pub reported: bool,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportIntent {
    pub reason: ReportReason,
    pub details: Option<String>,
}

impl ReportIntent {
    pub fn new(reason: ReportReason) -> Self {
        Self {
            reason,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Report state per [`ReportTarget`]. A target can be reported once.
pub struct ReportModel;

impl OptimisticModel for ReportModel {
    type Key = ReportTarget;
    type Value = ReportView;
    type Intent = ReportIntent;

    fn apply(_current: &ReportView, _intent: &ReportIntent) -> ReportView {
        ReportView {
            reported: true,
            hidden: true,
        }
    }

    fn satisfies(current: &ReportView, _intent: &ReportIntent) -> bool {
        current.reported
    }
}

#[async_trait]
impl RemoteMutation<ReportModel> for ApiClient {
    async fn execute(&self, target: &ReportTarget, intent: &ReportIntent) -> TetherResult<()> {
        self.report(target, &intent.reason, intent.details.as_deref())
            .await
    }
}

impl Reconciler<ReportModel> {
    pub async fn report(&self, target: ReportTarget, intent: ReportIntent) -> ActionOutcome {
        self.dispatch(target, intent).await
    }
}
