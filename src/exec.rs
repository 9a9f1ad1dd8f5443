//! Interactive session attachment
//!
//! The copied pod is entered with a `kubectl exec` subprocess that inherits
//! the invoking terminal's stdio, so the session feels like a local shell.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Terminal-attach collaborator; blocks until the remote session exits and
/// reports its exit code.
#[async_trait]
pub trait TerminalAttach {
    async fn attach(
        &self,
        pod_name: &str,
        namespace: &str,
        context: Option<&str>,
        command: &[String],
    ) -> std::io::Result<i32>;
}

/// Attaches by spawning `kubectl exec --stdin --tty`
pub struct KubectlAttach;

#[async_trait]
impl TerminalAttach for KubectlAttach {
    async fn attach(
        &self,
        pod_name: &str,
        namespace: &str,
        context: Option<&str>,
        command: &[String],
    ) -> std::io::Result<i32> {
        let mut cmd = Command::new("kubectl");
        cmd.arg(format!("--namespace={namespace}"));

        if let Some(context) = context {
            cmd.arg(format!("--context={context}"));
        }

        cmd.args(["exec", "--stdin", "--tty", pod_name, "--"])
            .args(command);

        debug!(pod_name, "Attaching interactive session via kubectl");

        let status = cmd.status().await?;
        // A session killed by a signal has no code; report a plain failure.
        Ok(status.code().unwrap_or(1))
    }
}
