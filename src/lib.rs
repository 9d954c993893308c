pub mod app_data;
pub mod config;
pub mod domain;
pub mod error;
pub mod output;
pub mod provider;
pub mod service;
pub mod storage;
