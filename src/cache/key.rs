use std::fmt;
use std::str::FromStr;

use super::ObjectMeta;
use crate::CacheError;

/// Address of a watched object: `namespace/name`, or `name` when the object
/// is cluster-scoped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    namespace: Option<String>,
    name: String,
}

impl ResourceKey {
    pub fn new(
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Self, CacheError> {
        if name.is_empty() {
            return Err(CacheError::MissingName);
        }
        if name.contains('/') || namespace.is_some_and(|ns| ns.contains('/')) {
            return Err(CacheError::InvalidKey(match namespace {
                Some(ns) => format!("{ns}/{name}"),
                None => name.to_string(),
            }));
        }

        Ok(Self {
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            name: name.to_string(),
        })
    }

    pub fn namespaced(
        namespace: &str,
        name: &str,
    ) -> Result<Self, CacheError> {
        Self::new(Some(namespace), name)
    }

    pub fn from_meta(meta: &ObjectMeta) -> Result<Self, CacheError> {
        Self::new(meta.namespace.as_deref(), &meta.name)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl FromStr for ResourceKey {
    type Err = CacheError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let mut parts = key.split('/');
        let parsed = match (parts.next(), parts.next(), parts.next()) {
            (Some(name), None, None) => Self::new(None, name),
            (Some(ns), Some(name), None) if !ns.is_empty() => Self::new(Some(ns), name),
            _ => return Err(CacheError::InvalidKey(key.to_string())),
        };
        parsed.map_err(|_| CacheError::InvalidKey(key.to_string()))
    }
}
