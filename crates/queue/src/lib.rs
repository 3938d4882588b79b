//! Background jobs for CommunityWatch.
//!
//! The only recurring work is the retention sweep: once per configured
//! interval, issues older than the retention window are deleted along with
//! their comments and upvotes. See [`scheduler`].

pub mod scheduler;

pub use scheduler::{
    JobExecutor, RetentionExecutor, ScheduledJob, SchedulerConfig, SchedulerState, run_job,
    run_scheduler,
};
