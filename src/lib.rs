pub mod aggregate;
pub mod app;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod kpi;
pub mod normalize;
pub mod output;
pub mod table;
pub mod views;
pub mod worldbank;
