pub mod alerts;
pub mod archive;
pub mod capture;
pub mod commands;
pub mod config;
pub mod dashboard;
pub mod humanize;
pub mod ledger;
pub mod notify;
pub mod observability;
pub mod orchestrator;
pub mod replication;
pub mod services;
pub mod status;
