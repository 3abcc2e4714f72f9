//! Source kubeconfig loading
//!
//! Reads the operator's existing kubeconfig and extracts the context whose
//! cluster the generated config will point at.

use kube::config::Kubeconfig as KubeKubeconfig;
use tracing::debug;

use crate::descriptor::{ClusterConfig, Kubeconfig, KubeconfigNames};
use crate::{Error, Result};

/// The selected context of the source kubeconfig
#[derive(Clone, Debug)]
pub struct SourceContext {
    pub names: KubeconfigNames,
    /// Cluster entry with its CA folded into inline data
    pub cluster: ClusterConfig,
    /// The kubeconfig as loaded, used to build the API client
    pub raw: KubeKubeconfig,
}

/// Load the source kubeconfig from `path`, or from the kube defaults.
pub fn load_source(path: Option<&str>, context_override: Option<&str>) -> Result<SourceContext> {
    let raw = match path.filter(|p| !p.is_empty()) {
        Some(path) => {
            debug!(path, "reading kubeconfig");
            KubeKubeconfig::read_from(path)?
        }
        None => KubeKubeconfig::read()?,
    };
    let kubeconfig = Kubeconfig::from_kube(&raw)?;
    let (names, cluster) = select_context(&kubeconfig, context_override)?;
    Ok(SourceContext {
        names,
        cluster,
        raw,
    })
}

/// Resolve the names and cluster entry of the active context.
pub fn select_context(
    kubeconfig: &Kubeconfig,
    context_override: Option<&str>,
) -> Result<(KubeconfigNames, ClusterConfig)> {
    let context_name = context_override
        .filter(|c| !c.is_empty())
        .unwrap_or(&kubeconfig.current_context);

    let context = kubeconfig
        .context(context_name)
        .ok_or_else(|| context_error(format!("no such context {:?}", context_name)))?;
    let mut cluster = kubeconfig
        .cluster(&context.cluster)
        .cloned()
        .ok_or_else(|| context_error(format!("no such cluster {:?}", context.cluster)))?;
    if kubeconfig.user(&context.user).is_none() {
        return Err(context_error(format!("no such user {:?}", context.user)));
    }

    cluster.inline_certificate_authority()?;

    Ok((
        KubeconfigNames {
            context: context_name.to_string(),
            user: context.user.clone(),
            cluster: context.cluster.clone(),
        },
        cluster,
    ))
}

fn context_error(reason: String) -> Error {
    Error::input(format!(
        "could not load --kubeconfig/--kubeconfig-context: {}",
        reason
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
apiVersion: v1
kind: Config
current-context: kind-kind
clusters:
- name: kind-cluster
  cluster:
    server: https://127.0.0.1:6443
    certificate-authority-data: dGVzdA==
- name: other-cluster
  cluster:
    server: https://other.example.com
users:
- name: kind-user
  user:
    token: abc
contexts:
- name: kind-kind
  context:
    cluster: kind-cluster
    user: kind-user
- name: missing-cluster
  context:
    cluster: nope
    user: kind-user
- name: missing-user
  context:
    cluster: other-cluster
    user: nobody
"#;

    fn source() -> Kubeconfig {
        serde_yaml::from_str(SOURCE).unwrap()
    }

    #[test]
    fn uses_current_context_by_default() {
        let (names, cluster) = select_context(&source(), None).unwrap();
        assert_eq!(
            names,
            KubeconfigNames {
                context: "kind-kind".to_string(),
                user: "kind-user".to_string(),
                cluster: "kind-cluster".to_string(),
            }
        );
        assert_eq!(cluster.server, "https://127.0.0.1:6443");
        assert_eq!(cluster.ca_bundle().unwrap().as_bytes(), b"test");
    }

    #[test]
    fn missing_context_is_reported() {
        let err = select_context(&source(), Some("does-not-exist")).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"could not load --kubeconfig/--kubeconfig-context: no such context "does-not-exist""#
        );
    }

    #[test]
    fn missing_cluster_is_reported() {
        let err = select_context(&source(), Some("missing-cluster")).unwrap_err();
        assert!(err.to_string().ends_with(r#"no such cluster "nope""#));
    }

    #[test]
    fn missing_user_is_reported() {
        let err = select_context(&source(), Some("missing-user")).unwrap_err();
        assert!(err.to_string().ends_with(r#"no such user "nobody""#));
    }

    #[test]
    fn loads_from_file() {
        let path = std::env::temp_dir().join(format!(
            "kestrel-source-kubeconfig-{}.yaml",
            std::process::id()
        ));
        std::fs::write(&path, SOURCE).unwrap();

        let source = load_source(path.to_str(), Some("kind-kind")).unwrap();
        assert_eq!(source.names.cluster, "kind-cluster");
        assert_eq!(source.raw.contexts.len(), 3);

        std::fs::remove_file(&path).unwrap();
    }
}
