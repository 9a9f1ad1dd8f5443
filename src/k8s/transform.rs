//! Pod specification rewriting for the copied pod
//!
//! Pure transformations over `Pod` values; nothing here talks to the
//! cluster. The stages must run in the order `prepare_pod` applies them,
//! since later stages assume the container list has already been narrowed
//! to a single entry.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Capabilities, EnvVar, Pod, SecurityContext};
use rand::Rng;

use crate::error::{CopypodError, Result};

/// Prefix for every copied pod's name
pub const POD_NAME_PREFIX: &str = "pod-copy-";

/// Label set identifying copied pods; replaces the source pod's labels
pub const COPY_LABEL: (&str, &str) = ("copypod", "true");

const SUFFIX_LEN: usize = 6;
const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Caller-supplied inputs to the transformation pipeline
#[derive(Debug, Clone, Default)]
pub struct CopyRequest {
    pub container: Option<String>,
    pub command: String,
    pub image: Option<String>,
    pub capabilities: Vec<String>,
    pub node_name: Option<String>,
    pub suffix: Option<String>,
    pub env: Vec<String>,
}

/// Run the full pipeline over a fetched pod, producing the specification
/// of the copy to submit.
pub fn prepare_pod<R: Rng>(
    pod: Pod,
    request: &CopyRequest,
    creator: &str,
    rng: &mut R,
) -> Result<Pod> {
    let pod = select_container(pod, request.container.as_deref())?;
    let pod = add_annotations(pod, creator);
    let pod = clear_fields(pod, request.node_name.as_deref());
    let pod = set_pod_name(pod, request.suffix.as_deref(), rng);
    let pod = configure_container(pod, &request.command, request.image.as_deref(), &request.env)?;
    Ok(add_capabilities(pod, &request.capabilities))
}

/// Narrow the pod's container list down to the one being copied.
pub fn select_container(mut pod: Pod, container_name: Option<&str>) -> Result<Pod> {
    let spec = pod.spec.get_or_insert_with(Default::default);

    match container_name {
        None => {
            if spec.containers.len() > 1 {
                return Err(CopypodError::AmbiguousContainer);
            }
        }
        Some(name) => {
            let selected = spec
                .containers
                .iter()
                .find(|c| c.name == name)
                .cloned()
                .ok_or_else(|| CopypodError::ContainerNotFound(name.to_string()))?;
            spec.containers = vec![selected];
        }
    }

    Ok(pod)
}

/// Annotate the copy so its origin stays traceable and external automation
/// leaves it alone. Annotations already on the source pod are preserved.
pub fn add_annotations(mut pod: Pod, creator: &str) -> Pod {
    let source_name = pod.metadata.name.clone().unwrap_or_default();
    let annotations = pod.metadata.annotations.get_or_insert_with(BTreeMap::new);

    annotations.insert("creator".to_string(), creator.to_string());
    annotations.insert("original-pod".to_string(), source_name);

    // https://karpenter.sh/docs/concepts/disruption/#pod-level-controls
    annotations.insert(
        "karpenter.sh/do-not-disrupt".to_string(),
        "true".to_string(),
    );

    // https://github.com/wichert/k8s-sentry/pull/14
    annotations.insert(
        "sentry/ignore-pod-updates".to_string(),
        "true".to_string(),
    );

    pod
}

/// Strip the identity fields the API server would reject on re-creation,
/// along with everything tying the copy to the source pod's scheduling and
/// supervision behavior.
///
/// The node name is cleared so the scheduler places the copy freely, unless
/// an explicit node was requested.
pub fn clear_fields(mut pod: Pod, node_name: Option<&str>) -> Pod {
    pod.metadata.creation_timestamp = None;
    pod.metadata.owner_references = None;
    pod.metadata.resource_version = None;
    pod.metadata.uid = None;
    pod.metadata.labels = Some(
        [(COPY_LABEL.0.to_string(), COPY_LABEL.1.to_string())]
            .into_iter()
            .collect(),
    );

    let spec = pod.spec.get_or_insert_with(Default::default);
    if let Some(container) = spec.containers.first_mut() {
        container.liveness_probe = None;
        container.readiness_probe = None;
        container.startup_probe = None;
        container.resources = None;
    }

    spec.affinity = None;
    spec.node_name = node_name.map(str::to_string);
    spec.restart_policy = Some("Never".to_string());

    pod.status = None;

    pod
}

/// Give the copy a name distinct from the source pod's.
///
/// No uniqueness check is made against the cluster; a collision on the six
/// random characters is accepted as negligible.
pub fn set_pod_name<R: Rng>(mut pod: Pod, suffix: Option<&str>, rng: &mut R) -> Pod {
    let suffix = match suffix {
        Some(suffix) => suffix.to_string(),
        None => random_suffix(rng),
    };

    pod.metadata.name = Some(format!("{POD_NAME_PREFIX}{suffix}"));

    pod
}

fn random_suffix<R: Rng>(rng: &mut R) -> String {
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect()
}

/// Replace the entrypoint of the remaining container, and optionally its
/// image and environment.
///
/// The old args are cleared since they belong to the replaced entrypoint.
/// Environment variables are appended, not replaced.
pub fn configure_container(
    mut pod: Pod,
    command: &str,
    image: Option<&str>,
    environment_variables: &[String],
) -> Result<Pod> {
    let tokens = split_command(command)?;

    let spec = pod.spec.get_or_insert_with(Default::default);
    if let Some(container) = spec.containers.first_mut() {
        container.command = Some(tokens);
        container.args = None;

        if let Some(image) = image {
            container.image = Some(image.to_string());
        }

        if !environment_variables.is_empty() {
            let env = container.env.get_or_insert_with(Vec::new);
            for pair in environment_variables {
                let (name, value) = pair
                    .split_once('=')
                    .ok_or_else(|| CopypodError::InvalidEnvironmentVariable(pair.clone()))?;
                env.push(EnvVar {
                    name: name.to_string(),
                    value: Some(value.to_string()),
                    ..Default::default()
                });
            }
        }
    }

    Ok(pod)
}

/// Grant extra capabilities to the remaining container.
///
/// Each entry may itself be a comma-separated list; tokens are upper-cased
/// and appended to whatever "add" list the source pod already carried.
pub fn add_capabilities(mut pod: Pod, capabilities: &[String]) -> Pod {
    if capabilities.is_empty() {
        return pod;
    }

    let tokens: Vec<String> = capabilities
        .iter()
        .flat_map(|group| group.split(','))
        .map(str::to_uppercase)
        .collect();

    let spec = pod.spec.get_or_insert_with(Default::default);
    if let Some(container) = spec.containers.first_mut() {
        container
            .security_context
            .get_or_insert_with(SecurityContext::default)
            .capabilities
            .get_or_insert_with(Capabilities::default)
            .add
            .get_or_insert_with(Vec::new)
            .extend(tokens);
    }

    pod
}

/// Split a command string into tokens using shell quoting rules.
pub fn split_command(command: &str) -> Result<Vec<String>> {
    shell_words::split(command).map_err(|source| CopypodError::InvalidCommand {
        command: command.to_string(),
        source,
    })
}
