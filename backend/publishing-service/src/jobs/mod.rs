//! Background jobs for publishing-service

pub mod like_reconciler;

pub use like_reconciler::start_like_reconciler;
