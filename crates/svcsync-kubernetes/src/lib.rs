// # svcsync-kubernetes
//
// Kubernetes side of the syncer:
//
// - **KubernetesServiceProvider**: lists services and their external addresses
// - **ConfigMapStateStore**: persists the prefix list in a ConfigMap
// - **KubeClient**: the small REST client both share
//
// Access is in-cluster (service account token and CA) unless an explicit
// API URL is configured, e.g. behind `kubectl proxy`.

pub mod client;
pub mod configmap;
pub mod services;

pub use client::KubeClient;
pub use configmap::ConfigMapStateStore;
pub use services::KubernetesServiceProvider;
