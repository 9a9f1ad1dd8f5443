//! Tests for the pod transformation pipeline
//!
//! These run the full pipeline over a realistic source pod and verify the
//! submitted specification is schedulable, stripped, and renamed.

use k8s_openapi::api::core::v1::Pod;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

use copypod::error::CopypodError;
use copypod::k8s::transform::{prepare_pod, CopyRequest};

/// A pod the way the API server would hand it back: stale identity fields,
/// probes, resources, scheduling constraints, and a live status.
fn source_pod() -> Pod {
    serde_json::from_value(json!({
        "metadata": {
            "name": "web",
            "namespace": "default",
            "uid": "0b8a44a4-3f29-4c2e-9d6e-2a8f5f6f9d11",
            "resourceVersion": "123456",
            "creationTimestamp": "2024-03-01T12:00:00Z",
            "labels": {"app": "web", "release": "prod"},
            "annotations": {"team": "platform"},
            "ownerReferences": [{
                "apiVersion": "apps/v1",
                "kind": "ReplicaSet",
                "name": "web-6d4b75cb6d",
                "uid": "9f7c1a60-ffb1-4a6e-8a3c-0f9f3c2d4b55"
            }]
        },
        "spec": {
            "nodeName": "node-a",
            "restartPolicy": "Always",
            "affinity": {
                "nodeAffinity": {
                    "requiredDuringSchedulingIgnoredDuringExecution": {
                        "nodeSelectorTerms": [{
                            "matchExpressions": [
                                {"key": "zone", "operator": "In", "values": ["eu-west-1a"]}
                            ]
                        }]
                    }
                }
            },
            "containers": [{
                "name": "app",
                "image": "nginx",
                "args": ["--port", "8080"],
                "livenessProbe": {"httpGet": {"path": "/healthz", "port": 8080}},
                "readinessProbe": {"httpGet": {"path": "/ready", "port": 8080}},
                "startupProbe": {"httpGet": {"path": "/healthz", "port": 8080}},
                "resources": {
                    "limits": {"cpu": "500m", "memory": "256Mi"},
                    "requests": {"cpu": "100m", "memory": "128Mi"}
                },
                "env": [{"name": "EXISTING", "value": "1"}]
            }]
        },
        "status": {"phase": "Running", "podIP": "10.0.0.12"}
    }))
    .unwrap()
}

fn default_request() -> CopyRequest {
    CopyRequest {
        command: "sleep infinity".to_string(),
        ..Default::default()
    }
}

#[test]
fn test_pipeline_produces_schedulable_copy() {
    let mut rng = StdRng::seed_from_u64(1);
    let pod = prepare_pod(source_pod(), &default_request(), "alice", &mut rng).unwrap();

    // Identity is fresh
    assert_eq!(pod.metadata.uid, None);
    assert_eq!(pod.metadata.resource_version, None);
    assert_eq!(pod.metadata.owner_references, None);
    assert_eq!(pod.metadata.creation_timestamp, None);
    assert!(pod.status.is_none());

    // Name is distinct from the source and matches the copy pattern
    let name = pod.metadata.name.as_deref().unwrap();
    assert_ne!(name, "web");
    let suffix = name.strip_prefix("pod-copy-").unwrap();
    assert_eq!(suffix.len(), 6);
    assert!(suffix
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));

    // Scheduling constraints are gone, supervision is off
    let spec = pod.spec.as_ref().unwrap();
    assert!(spec.affinity.is_none());
    assert_eq!(spec.node_name, None);
    assert_eq!(spec.restart_policy, Some("Never".to_string()));

    // Exactly one container, probes and resources stripped, entrypoint replaced
    assert_eq!(spec.containers.len(), 1);
    let container = &spec.containers[0];
    assert!(container.liveness_probe.is_none());
    assert!(container.readiness_probe.is_none());
    assert!(container.startup_probe.is_none());
    assert!(container.resources.is_none());
    assert_eq!(
        container.command,
        Some(vec!["sleep".to_string(), "infinity".to_string()])
    );
    assert_eq!(container.args, None);
    assert_eq!(container.image, Some("nginx".to_string()));
}

#[test]
fn test_pipeline_labels_and_annotations() {
    let mut rng = StdRng::seed_from_u64(1);
    let pod = prepare_pod(source_pod(), &default_request(), "alice", &mut rng).unwrap();

    // Labels are replaced outright; annotations are merged
    assert_eq!(
        pod.metadata.labels,
        Some(
            [("copypod".to_string(), "true".to_string())]
                .into_iter()
                .collect()
        )
    );

    let annotations = pod.metadata.annotations.as_ref().unwrap();
    assert_eq!(annotations.get("team"), Some(&"platform".to_string()));
    assert_eq!(annotations.get("creator"), Some(&"alice".to_string()));
    assert_eq!(annotations.get("original-pod"), Some(&"web".to_string()));
    assert_eq!(
        annotations.get("karpenter.sh/do-not-disrupt"),
        Some(&"true".to_string())
    );
    assert_eq!(
        annotations.get("sentry/ignore-pod-updates"),
        Some(&"true".to_string())
    );
}

#[test]
fn test_pipeline_with_overrides() {
    let mut rng = StdRng::seed_from_u64(1);
    let request = CopyRequest {
        command: "sh -c 'sleep 300'".to_string(),
        image: Some("busybox:1.36".to_string()),
        capabilities: vec!["net_admin,sys_ptrace".to_string()],
        node_name: Some("node-b".to_string()),
        suffix: Some("x1".to_string()),
        env: vec!["DEBUG=1".to_string(), "OPTS=a=b".to_string()],
        ..Default::default()
    };

    let pod = prepare_pod(source_pod(), &request, "alice", &mut rng).unwrap();

    assert_eq!(pod.metadata.name, Some("pod-copy-x1".to_string()));

    let spec = pod.spec.as_ref().unwrap();
    assert_eq!(spec.node_name, Some("node-b".to_string()));

    let container = &spec.containers[0];
    assert_eq!(container.image, Some("busybox:1.36".to_string()));
    assert_eq!(
        container.command,
        Some(vec![
            "sh".to_string(),
            "-c".to_string(),
            "sleep 300".to_string()
        ])
    );

    let env = container.env.as_ref().unwrap();
    let pairs: Vec<_> = env
        .iter()
        .map(|e| (e.name.as_str(), e.value.as_deref().unwrap()))
        .collect();
    assert_eq!(
        pairs,
        vec![("EXISTING", "1"), ("DEBUG", "1"), ("OPTS", "a=b")]
    );

    let caps = container
        .security_context
        .as_ref()
        .unwrap()
        .capabilities
        .as_ref()
        .unwrap()
        .add
        .as_ref()
        .unwrap();
    assert_eq!(caps, &["NET_ADMIN", "SYS_PTRACE"]);
}

#[test]
fn test_pipeline_rejects_multi_container_pod_without_choice() {
    let mut pod = source_pod();
    let mut sidecar = pod.spec.as_ref().unwrap().containers[0].clone();
    sidecar.name = "sidecar".to_string();
    pod.spec.as_mut().unwrap().containers.push(sidecar);

    let mut rng = StdRng::seed_from_u64(1);
    let err = prepare_pod(pod, &default_request(), "alice", &mut rng).unwrap_err();
    assert!(matches!(err, CopypodError::AmbiguousContainer));
}

#[test]
fn test_pipeline_selects_named_container_from_multi_container_pod() {
    let mut pod = source_pod();
    let mut sidecar = pod.spec.as_ref().unwrap().containers[0].clone();
    sidecar.name = "sidecar".to_string();
    pod.spec.as_mut().unwrap().containers.push(sidecar);

    let mut rng = StdRng::seed_from_u64(1);
    let request = CopyRequest {
        container: Some("sidecar".to_string()),
        ..default_request()
    };

    let pod = prepare_pod(pod, &request, "alice", &mut rng).unwrap();
    let spec = pod.spec.as_ref().unwrap();
    assert_eq!(spec.containers.len(), 1);
    assert_eq!(spec.containers[0].name, "sidecar");
}
