//! Copy lifecycle for the cloned pod
//!
//! Sequences the cluster-facing steps around the transformation pipeline:
//! resolve the source pod, fetch it, rewrite it, submit the copy, wait for
//! it to come up, then either hand the name back or run an interactive
//! session and tear the copy down.

use std::time::Duration;

use tracing::{info, warn};

use crate::cli::Cli;
use crate::error::{api_reason, CopypodError, Result};
use crate::exec::TerminalAttach;
use crate::k8s::client::PodApi;
use crate::k8s::transform::{self, CopyRequest};

/// Grace period used when tearing down the copy, kept short so interactive
/// sessions end promptly.
const DELETE_GRACE_PERIOD_SECONDS: u32 = 1;

/// Interval between phase polls while waiting for the copy to start
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Drives one copy lifecycle against the cluster
pub struct CopyManager<C, A> {
    cluster: C,
    attach: A,
}

impl<C: PodApi, A: TerminalAttach> CopyManager<C, A> {
    pub fn new(cluster: C, attach: A) -> Self {
        Self { cluster, attach }
    }

    /// Run the whole lifecycle and return the process exit code.
    ///
    /// Failures before the copy is created abort with nothing to clean up.
    /// Once an interactive session has been requested, teardown always runs
    /// and the session's exit code stands regardless of teardown problems.
    pub async fn run(&self, args: &Cli) -> Result<i32> {
        let source_name = self.resolve_target(args).await?;

        let source = self
            .cluster
            .read_pod(&source_name)
            .await
            .map_err(|e| CopypodError::Fetch(api_reason(&e)))?;

        let request = CopyRequest {
            container: args.container.clone(),
            command: args.command.clone(),
            image: args.image.clone(),
            capabilities: args.cap_add.clone(),
            node_name: args.node_name.clone(),
            suffix: args.suffix.clone(),
            env: args.env.clone(),
        };
        let prepared = transform::prepare_pod(
            source,
            &request,
            &whoami::username(),
            &mut rand::thread_rng(),
        )?;

        let created = self
            .cluster
            .create_pod(&prepared)
            .await
            .map_err(|e| CopypodError::Create(api_reason(&e)))?;
        let pod_name = created.metadata.name.clone().unwrap_or_default();

        self.wait_until_running(&pod_name).await;

        match &args.interactive {
            None => {
                // The pod is left running for the caller; its name is the
                // only output on stdout.
                println!("{pod_name}");
                Ok(0)
            }
            Some(interactive) => {
                let outcome = self.interactive_session(&pod_name, args, interactive).await;
                self.cleanup(&pod_name).await;
                outcome
            }
        }
    }

    /// Resolve the source pod name, either directly or as the first pod
    /// matching the label selector in API list order.
    async fn resolve_target(&self, args: &Cli) -> Result<String> {
        if let Some(pod) = &args.pod {
            return Ok(pod.clone());
        }

        // The CLI guarantees a selector is present when no pod name is.
        let selector = args.selector.as_deref().unwrap_or_default();
        let pods = self
            .cluster
            .list_pods(selector)
            .await
            .map_err(|e| CopypodError::Fetch(api_reason(&e)))?;

        pods.into_iter()
            .next()
            .and_then(|pod| pod.metadata.name)
            .ok_or(CopypodError::NoMatchingPod)
    }

    /// Poll until the copy reports a Running phase.
    ///
    /// Poll errors are treated as transient and the wait is unbounded; a
    /// copy that can never be scheduled blocks the invocation until the
    /// process is interrupted.
    async fn wait_until_running(&self, pod_name: &str) {
        loop {
            match self.cluster.read_pod(pod_name).await {
                Ok(pod) => {
                    let phase = pod.status.as_ref().and_then(|s| s.phase.as_deref());
                    if phase == Some("Running") {
                        info!(pod = %pod_name, "Copied pod is running");
                        return;
                    }
                }
                Err(e) => {
                    warn!(error = %api_reason(&e), "Failed to poll copied pod, retrying");
                }
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn interactive_session(
        &self,
        pod_name: &str,
        args: &Cli,
        interactive: &str,
    ) -> Result<i32> {
        let command = transform::split_command(interactive)?;
        let exit_code = self
            .attach
            .attach(pod_name, &args.namespace, args.context.as_deref(), &command)
            .await?;
        Ok(exit_code)
    }

    /// Best-effort teardown; a delete failure is reported but never changes
    /// the invocation's exit code.
    async fn cleanup(&self, pod_name: &str) {
        if let Err(e) = self
            .cluster
            .delete_pod(pod_name, DELETE_GRACE_PERIOD_SECONDS)
            .await
        {
            warn!(
                pod = %pod_name,
                "{}",
                CopypodError::Delete(api_reason(&e))
            );
        }
    }
}
