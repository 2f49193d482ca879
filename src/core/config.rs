// src/core/config.rs

//! The immutable runtime configuration threaded through every component.
//! Built once, by [`crate::cli::Cli::into_config`], from parsed CLI flags.

use std::time::Duration;

use crate::core::constants;

/// Plain configuration data. No component reaches into globals; everything
/// that needs a tunable gets it through this struct or a value derived from it.
#[derive(Debug, Clone)]
pub struct Config {
    pub master_name: String,

    pub db_port: u16,
    pub db_user: String,
    pub db_pass: String,

    pub proxy_host: String,
    pub proxy_admin_port: u16,
    pub proxy_admin_user: String,
    pub proxy_admin_pass: String,

    pub notify_to: String,

    pub log_file: String,
    pub ignore_start_warning: bool,
    pub report_hour: u32,

    pub tick_interval: Duration,
    pub master_retries: u32,
    pub master_retry_delay: Duration,

    pub writer_group_id: u32,
    pub reader_group_id: u32,
    pub quarantine_group_id: u32,

    pub conn_timeout: Duration,
}

impl Config {
    /// The logical quorum for a given number of recognized nodes: `⌊N/2⌋ + 1`.
    pub fn quorum(n: usize) -> usize {
        n / 2 + 1
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            master_name: "cluster".to_string(),
            db_port: constants::DEFAULT_DB_PORT,
            db_user: String::new(),
            db_pass: String::new(),
            proxy_host: String::new(),
            proxy_admin_port: constants::DEFAULT_PROXY_ADMIN_PORT,
            proxy_admin_user: String::new(),
            proxy_admin_pass: String::new(),
            notify_to: String::new(),
            log_file: "./orchestrator.log".to_string(),
            ignore_start_warning: false,
            report_hour: 12,
            tick_interval: Duration::from_secs(1),
            master_retries: 2,
            master_retry_delay: Duration::from_secs(4),
            writer_group_id: constants::DEFAULT_WRITER_GROUP_ID,
            reader_group_id: constants::DEFAULT_READER_GROUP_ID,
            quarantine_group_id: constants::DEFAULT_QUARANTINE_GROUP_ID,
            conn_timeout: constants::DEFAULT_CONN_TIMEOUT,
        }
    }
}
