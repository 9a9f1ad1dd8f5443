//! copypod
//!
//! Copies a running Kubernetes pod into a disposable, debug-friendly copy:
//! the source specification is fetched, stripped of identity and runtime
//! behavior, renamed, re-submitted, waited on, and optionally attached to
//! and torn down afterward.

pub mod cli;
pub mod error;
pub mod exec;
pub mod k8s;

use anyhow::Result;

use crate::cli::Cli;
use crate::exec::KubectlAttach;
use crate::k8s::{CopyManager, K8sClient};

/// Build the cluster client and run one copy lifecycle, returning the
/// process exit code.
pub async fn run(args: Cli) -> Result<i32> {
    let k8s = K8sClient::new(args.context.as_deref(), &args.namespace).await?;
    let manager = CopyManager::new(k8s, KubectlAttach);

    Ok(manager.run(&args).await?)
}
