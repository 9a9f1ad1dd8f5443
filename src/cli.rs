//! Command-line interface for copypod

use clap::{ArgGroup, Parser};

/// Copy a Kubernetes pod and run commands in its environment.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "copypod",
    version,
    about = "Copy a Kubernetes pod and run commands in its environment",
    after_help = "If the `--interactive` flag is provided, the copied pod will be removed \
                  immediately after the command exits, otherwise the name of the pod will \
                  be printed."
)]
#[command(group(ArgGroup::new("target").required(true).args(["selector", "pod"])))]
pub struct Cli {
    /// Kubectl context to use for configuration
    #[arg(long)]
    pub context: Option<String>,

    /// Namespace for where the source pod is located
    #[arg(short = 'n', long, default_value = "default")]
    pub namespace: String,

    /// Label selector of pod to copy
    #[arg(short = 'l', long)]
    pub selector: Option<String>,

    /// Name of the pod to copy
    #[arg(short = 'p', long)]
    pub pod: Option<String>,

    /// Name of container to copy, only needed if the pod has more than one container
    #[arg(long)]
    pub container: Option<String>,

    /// Initial command to run in the copied pod
    #[arg(short = 'c', long, default_value = "sleep infinity")]
    pub command: String,

    /// Command to run in an interactive console
    #[arg(short = 'i', long)]
    pub interactive: Option<String>,

    /// Alternate Docker image to use for the copied pod
    #[arg(long)]
    pub image: Option<String>,

    /// Capabilities to add for the copied pod, each value may be a comma-separated list
    #[arg(long = "cap-add", value_name = "CAPABILITY")]
    pub cap_add: Vec<String>,

    /// Node the copied pod should run on
    #[arg(long)]
    pub node_name: Option<String>,

    /// Suffix for the copied pod's name, instead of a random one
    #[arg(long)]
    pub suffix: Option<String>,

    /// Environment variables to set in the copied pod, in the format NAME=value
    #[arg(short = 'e', long = "env", value_name = "NAME=value")]
    pub env: Vec<String>,
}
