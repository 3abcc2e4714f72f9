//! Kubeconfig model
//!
//! Used both to read the user's existing kubeconfig and to emit the generated
//! one. Only the fields the generator reads or writes are modelled; everything
//! else in the source kubeconfig is ignored.

use serde::{Deserialize, Deserializer, Serialize};

use crate::ca::CaBundle;
use crate::Result;

/// `apiVersion` of client credential plugins invoked by kubectl.
pub const EXEC_API_VERSION: &str = "client.authentication.k8s.io/v1beta1";

/// Kubeconfig structure
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Kubeconfig {
    #[serde(rename = "apiVersion", default, deserialize_with = "null_as_default")]
    pub api_version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub clusters: Vec<NamedCluster>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub users: Vec<NamedUser>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contexts: Vec<NamedContext>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_context: String,
    #[serde(default, skip_deserializing)]
    pub preferences: Preferences,
}

/// Always-empty `preferences` block
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct Preferences {}

/// Cluster entry in kubeconfig
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NamedCluster {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cluster: ClusterConfig,
}

/// Cluster configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub server: String,
    /// CA certificate (base64 encoded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_authority_data: Option<String>,
    /// CA certificate file path; folded into `certificate_authority_data` on load
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_authority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure_skip_tls_verify: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_server_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
}

impl ClusterConfig {
    /// Decoded `certificate-authority-data`, empty when unset.
    pub fn ca_bundle(&self) -> std::result::Result<CaBundle, base64::DecodeError> {
        match self.certificate_authority_data.as_deref() {
            Some(data) if !data.is_empty() => CaBundle::from_base64(data),
            _ => Ok(CaBundle::default()),
        }
    }

    /// Replace the CA with inline `bundle` data.
    pub fn set_ca_bundle(&mut self, bundle: &CaBundle) {
        self.certificate_authority = None;
        self.certificate_authority_data = if bundle.is_empty() {
            None
        } else {
            Some(bundle.to_base64())
        };
    }

    /// Read a file-based CA into inline data so the cluster entry is self-contained.
    pub fn inline_certificate_authority(&mut self) -> Result<()> {
        if let Some(path) = self.certificate_authority.take() {
            if self.certificate_authority_data.is_none() {
                let pem = std::fs::read(&path)?;
                self.set_ca_bundle(&CaBundle::new(pem));
            }
        }
        Ok(())
    }
}

/// User entry in kubeconfig
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NamedUser {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user: UserConfig,
}

/// User configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct UserConfig {
    /// Exec credential plugin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<ExecConfig>,
}

/// Exec credential plugin configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub api_version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub command: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub args: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub env: Vec<ExecEnvVar>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub provide_cluster_info: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub install_hint: String,
}

/// Environment variable passed to the exec plugin
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExecEnvVar {
    pub name: String,
    pub value: String,
}

/// Context entry in kubeconfig
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NamedContext {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub context: ContextConfig,
}

/// Context configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ContextConfig {
    /// Cluster name (reference)
    #[serde(default, deserialize_with = "null_as_default")]
    pub cluster: String,
    /// User name (reference)
    #[serde(default, deserialize_with = "null_as_default")]
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Names of the cluster, user and context entries of one kubeconfig context
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KubeconfigNames {
    pub context: String,
    pub user: String,
    pub cluster: String,
}

impl KubeconfigNames {
    /// Append `suffix` to each name.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self {
            context: format!("{}{}", self.context, suffix),
            user: format!("{}{}", self.user, suffix),
            cluster: format!("{}{}", self.cluster, suffix),
        }
    }
}

impl Kubeconfig {
    /// Build a single-context kubeconfig whose user runs `exec`.
    pub fn new_exec(cluster: ClusterConfig, exec: ExecConfig, names: &KubeconfigNames) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "Config".to_string(),
            clusters: vec![NamedCluster {
                name: names.cluster.clone(),
                cluster,
            }],
            users: vec![NamedUser {
                name: names.user.clone(),
                user: UserConfig { exec: Some(exec) },
            }],
            contexts: vec![NamedContext {
                name: names.context.clone(),
                context: ContextConfig {
                    cluster: names.cluster.clone(),
                    user: names.user.clone(),
                    namespace: None,
                },
            }],
            current_context: names.context.clone(),
            preferences: Preferences::default(),
        }
    }

    /// Convert a kubeconfig loaded by kube into this model.
    pub fn from_kube(kubeconfig: &kube::config::Kubeconfig) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::to_value(kubeconfig)?)?)
    }

    pub fn context(&self, name: &str) -> Option<&ContextConfig> {
        self.contexts
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.context)
    }

    pub fn cluster(&self, name: &str) -> Option<&ClusterConfig> {
        self.clusters
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.cluster)
    }

    pub fn user(&self, name: &str) -> Option<&UserConfig> {
        self.users.iter().find(|u| u.name == name).map(|u| &u.user)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
