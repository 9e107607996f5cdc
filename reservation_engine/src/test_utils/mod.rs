pub mod null_audit;
pub mod prepare_env;

pub use null_audit::NullAuditLog;
