//! fa-search-bot - A Discord bot posting new FA submissions matching saved
//! search queries.
//!
//! The core is the [`task::subscription_watcher::SubscriptionWatcher`], which
//! polls the FA export API for every subscribed query and notifies chats
//! about results newer than their watermark.

pub mod api;
pub mod bot;
pub mod config;
pub mod entity;
pub mod error;
pub mod logging;
pub mod notify;
pub mod repository;
pub mod service;
pub mod submission;
pub mod subscription;
pub mod task;
