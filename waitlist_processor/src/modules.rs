pub mod clock;
pub mod duplicate_checker;
pub mod error;
pub mod rate_limit_store;
pub mod rate_limit_sweeper;
pub mod rate_limiter;
pub mod sanitizer;
pub mod sinks;
pub mod submission_dispatcher;
pub mod validation;
pub mod waitlist_api;
