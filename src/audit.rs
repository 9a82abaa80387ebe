use crate::resolver::Rejection;
use std::sync::Arc;

pub type DynAuditSink = Arc<dyn AuditSink + Send + Sync + 'static>;

/// Operator-facing record of refused image requests.
pub trait AuditSink {
    fn rejected(&self, reason: &Rejection, requested: &str);
}

/// Emits a debug event per rejection. The raw input is `Debug`-formatted so
/// control characters are escaped.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    fn rejected(&self, reason: &Rejection, requested: &str) {
        tracing::debug!(
            target: "safe_gallery::audit",
            code = reason.code(),
            requested = ?requested,
            "image request rejected"
        );
    }
}

pub fn from_config(cfg: &crate::config::Audit) -> Option<DynAuditSink> {
    cfg.log_rejections.then(|| Arc::new(TracingAudit) as DynAuditSink)
}
