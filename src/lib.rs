pub mod config;
pub mod gateway;
pub mod i18n;
pub mod jobs;
pub mod leads;
pub mod manager;
pub mod monitoring;
pub mod retry;
pub mod telegram;
