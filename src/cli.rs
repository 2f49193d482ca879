// src/cli.rs

//! Command-line parsing. `Cli::into_config` is the one place cross-field
//! validation happens before the rest of the program ever sees a [`Config`].

use clap::Parser;

use crate::core::config::Config;
use crate::core::constants;
use crate::core::errors::{OrchestratorError, Result};

#[derive(Parser, Debug)]
#[command(name = "topoward", version, about = "Replication cluster orchestrator")]
pub struct Cli {
    /// Logical name of the monitored primary, used in notification subjects and logs.
    #[arg(long, default_value = "cluster")]
    pub master_name: String,

    #[arg(long)]
    pub db_user: String,
    #[arg(long)]
    pub db_pass: String,
    #[arg(long, default_value_t = constants::DEFAULT_DB_PORT)]
    pub db_port: u16,

    #[arg(long)]
    pub proxy_host: String,
    #[arg(long, default_value_t = constants::DEFAULT_PROXY_ADMIN_PORT)]
    pub proxy_admin_port: u16,
    #[arg(long)]
    pub proxy_admin_user: String,
    #[arg(long)]
    pub proxy_admin_pass: String,

    #[arg(long)]
    pub notify_to: String,

    #[arg(long, default_value = "./orchestrator.log")]
    pub log_file: String,

    #[arg(long, default_value_t = false)]
    pub ignore_start_warning: bool,

    /// UTC hour (0-23) at which the daily report is sent.
    #[arg(long, default_value_t = 12)]
    pub report_hour: u32,

    #[arg(long, default_value_t = 1)]
    pub tick_interval_secs: u64,
    #[arg(long, default_value_t = 2)]
    pub master_retries: u32,
    #[arg(long, default_value_t = 4)]
    pub master_retry_delay_secs: u64,

    #[arg(long, default_value_t = constants::DEFAULT_WRITER_GROUP_ID)]
    pub writer_group_id: u32,
    #[arg(long, default_value_t = constants::DEFAULT_READER_GROUP_ID)]
    pub reader_group_id: u32,
    #[arg(long, default_value_t = constants::DEFAULT_QUARANTINE_GROUP_ID)]
    pub quarantine_group_id: u32,
}

impl Cli {
    pub fn into_config(self) -> Result<Config> {
        if self.report_hour > 23 {
            return Err(OrchestratorError::Config(format!(
                "--report-hour must be in 0..=23, got {}",
                self.report_hour
            )));
        }

        Ok(Config {
            master_name: self.master_name,
            db_port: self.db_port,
            db_user: self.db_user,
            db_pass: self.db_pass,
            proxy_host: self.proxy_host,
            proxy_admin_port: self.proxy_admin_port,
            proxy_admin_user: self.proxy_admin_user,
            proxy_admin_pass: self.proxy_admin_pass,
            notify_to: self.notify_to,
            log_file: self.log_file,
            ignore_start_warning: self.ignore_start_warning,
            report_hour: self.report_hour,
            tick_interval: std::time::Duration::from_secs(self.tick_interval_secs),
            master_retries: self.master_retries,
            master_retry_delay: std::time::Duration::from_secs(self.master_retry_delay_secs),
            writer_group_id: self.writer_group_id,
            reader_group_id: self.reader_group_id,
            quarantine_group_id: self.quarantine_group_id,
            conn_timeout: constants::DEFAULT_CONN_TIMEOUT,
        })
    }
}
