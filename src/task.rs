//! Background tasks.

pub mod subscription_watcher;
