//! Kubernetes integration for copypod
//!
//! This module covers everything between the CLI and the cluster:
//! - fetching and re-creating pods through a namespaced client
//! - rewriting the fetched specification into the disposable copy
//! - sequencing the copy lifecycle with its cleanup semantics

mod client;
mod copier;
pub mod transform;

pub use client::{K8sClient, PodApi};
pub use copier::CopyManager;
