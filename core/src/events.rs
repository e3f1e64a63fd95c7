//! Event names published by the dashboard backend

pub const LOG_RECEIVED: &str = "log_received";
pub const SERVER_STATUS_CHANGED: &str = "server_status_changed";
pub const SERVER_METRICS_RECEIVED: &str = "server_metrics_received";
pub const APPLICATION_STATUS_CHANGED: &str = "application_status_changed";
pub const DEPLOYMENT_CREATED: &str = "deployment_created";
pub const DEPLOYMENT_STARTED: &str = "deployment_started";
pub const DEPLOYMENT_FINISHED: &str = "deployment_finished";
pub const DEPLOYMENT_STATUS_CHANGED: &str = "deployment_status_changed";
pub const DEPLOYMENT_COMMIT_INFO_RECEIVED: &str = "deployment_commit_info_received";
pub const JOB_CREATED: &str = "job_created";
pub const JOB_STARTED: &str = "job_started";
pub const JOB_FINISHED: &str = "job_finished";
pub const JOB_STATUS_CHANGED: &str = "job_status_changed";
