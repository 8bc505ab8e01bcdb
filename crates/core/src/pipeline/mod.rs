pub mod dedup_coordinator;
pub mod infrastructure;
pub mod reconcile_uploads_use_case;
pub mod submission_stats;
