use std::fmt::Debug;

use serde::Deserialize;
use serde::Serialize;

use super::ResourceKey;
use crate::CacheError;

/// Identity and version metadata every watched object carries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,

    /// `None` for cluster-scoped objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Opaque version token assigned by the source
    #[serde(default)]
    pub resource_version: String,
}

impl ObjectMeta {
    pub fn namespaced(
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
            resource_version: String::new(),
        }
    }

    pub fn cluster_scoped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            resource_version: String::new(),
        }
    }

    pub fn with_resource_version(
        mut self,
        resource_version: impl Into<String>,
    ) -> Self {
        self.resource_version = resource_version.into();
        self
    }
}

/// A watched object kind.
pub trait Resource: Clone + Debug + Send + Sync + 'static {
    /// Kind name used in logs
    const KIND: &'static str;

    fn meta(&self) -> &ObjectMeta;

    fn meta_mut(&mut self) -> &mut ObjectMeta;

    /// `None` for cluster-scoped objects. An empty namespace counts as none.
    fn namespace(&self) -> Option<&str> {
        self.meta().namespace.as_deref().filter(|ns| !ns.is_empty())
    }

    fn name(&self) -> &str {
        &self.meta().name
    }

    fn resource_version(&self) -> &str {
        &self.meta().resource_version
    }

    /// Derives the cache/queue address of this object.
    fn key(&self) -> Result<ResourceKey, CacheError> {
        ResourceKey::from_meta(self.meta())
    }
}
