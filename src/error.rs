//! Error types for copypod operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CopypodError>;

/// Everything that can go wrong while copying a pod.
///
/// The first four variants are local validation failures surfaced before
/// any cluster state changes; the cluster variants wrap the API server's
/// reason string. No operation is retried.
#[derive(Debug, Error)]
pub enum CopypodError {
    #[error("Pod contains multiple containers but `--container` wasn't specified")]
    AmbiguousContainer,

    #[error("The specified container `{0}` was not found in the pod")]
    ContainerNotFound(String),

    #[error("Environment variables need to be provided in the format: NAME=value (got `{0}`)")]
    InvalidEnvironmentVariable(String),

    #[error("Unable to parse command `{command}`: {source}")]
    InvalidCommand {
        command: String,
        source: shell_words::ParseError,
    },

    #[error("No pods were found which matched the provided labels")]
    NoMatchingPod,

    #[error("Error occurred when trying to get information about existing pod: {0}")]
    Fetch(String),

    #[error("Error occurred when trying to create copied pod: {0}")]
    Create(String),

    #[error("Error occurred when trying to delete copied pod: {0}")]
    Delete(String),

    #[error("Failed to run kubectl: {0}")]
    Attach(#[from] std::io::Error),
}

/// Extract the API server's reason string from a kube error.
///
/// Transport-level failures have no structured reason and fall back to
/// their display form.
pub(crate) fn api_reason(err: &kube::Error) -> String {
    match err {
        kube::Error::Api(response) if !response.reason.is_empty() => response.reason.clone(),
        other => other.to_string(),
    }
}
