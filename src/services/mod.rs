pub mod aggregation;
pub mod announcements;
pub mod clock;
pub mod dashboard;
pub mod export;
pub mod interactions;
pub mod lifecycle;
pub mod metrics;
pub mod registrations;
pub mod render;
pub mod scheduler;
pub mod transport;
