use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::ObjectMeta;
use crate::Resource;

/// Declared state of one operator version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorVersion {
    pub metadata: ObjectMeta,
    pub spec: OperatorVersionSpec,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorVersionSpec {
    /// Unstructured strategy payload, decoded by [`crate::InstallStrategy`]
    #[serde(default)]
    pub install_strategy: Value,
}

impl OperatorVersion {
    pub fn new(
        metadata: ObjectMeta,
        install_strategy: Value,
    ) -> Self {
        Self {
            metadata,
            spec: OperatorVersionSpec { install_strategy },
        }
    }
}

impl Resource for OperatorVersion {
    const KIND: &'static str = "OperatorVersion";

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}
