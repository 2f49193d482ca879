// src/core/lock.rs

//! The durable single-instance lock kept in the proxy's auxiliary KV table,
//! and dangerous-start detection.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::core::constants::{KV_LOCK_HELD_VALUE, KV_LOCK_KEY};
use crate::core::errors::Result;
use crate::core::proxy::ProxyAdminClient;

/// Asks for human confirmation before proceeding with a dangerous start.
/// Injected so tests can supply a deterministic answer without a terminal
/// attached.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Reads a yes/no answer from blocking stdin.
pub struct StdinConfirmer;

#[async_trait]
impl Confirmer for StdinConfirmer {
    async fn confirm(&self, prompt: &str) -> bool {
        println!("{prompt} [y/N]: ");
        tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).ok();
            line.trim().eq_ignore_ascii_case("y")
        })
        .await
        .unwrap_or(false)
    }
}

/// Outcome of [`acquire_on_start`]: whether the previous run exited abruptly,
/// and whether the operator (or `--ignore-start-warning`) allowed the start
/// to proceed anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartOutcome {
    pub dangerous: bool,
    pub proceed: bool,
}

/// Ensures the KV table exists, then inspects the `lock` key. The
/// caller is responsible for exiting with the dedicated code if `kv_init`
/// fails (`OrchestratorError::KvInitFailed` propagates from here).
pub async fn acquire_on_start(
    proxy: &dyn ProxyAdminClient,
    confirmer: &dyn Confirmer,
    ignore_start_warning: bool,
) -> Result<StartOutcome> {
    proxy.kv_init().await?;

    match proxy.kv_get(KV_LOCK_KEY).await? {
        None => {
            proxy.kv_upsert(KV_LOCK_KEY, KV_LOCK_HELD_VALUE).await?;
            Ok(StartOutcome {
                dangerous: false,
                proceed: true,
            })
        }
        Some(_) => {
            warn!("lock key present at startup: previous run exited uncleanly");
            let proceed = if ignore_start_warning {
                true
            } else {
                confirmer
                    .confirm("Previous run did not shut down cleanly. Start anyway?")
                    .await
            };
            if proceed {
                proxy.kv_upsert(KV_LOCK_KEY, KV_LOCK_HELD_VALUE).await?;
            }
            Ok(StartOutcome {
                dangerous: true,
                proceed,
            })
        }
    }
}

/// Deletes the lock key on orderly shutdown.
pub async fn release_on_shutdown(proxy: &dyn ProxyAdminClient) -> Result<()> {
    proxy.kv_delete(KV_LOCK_KEY).await?;
    info!("lock released, shutdown was orderly");
    Ok(())
}
