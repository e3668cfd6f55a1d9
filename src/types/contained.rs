use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A resource embedded in `Questionnaire.contained`, usually a ValueSet.
///
/// Items point at it by id only; removing it never touches the items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainedResource {
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    pub id: String,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl ContainedResource {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            body: Map::new(),
        }
    }

    /// A contained ValueSet with an inline expansion of `(code, display)` pairs.
    pub fn value_set(id: impl Into<String>, system: &str, concepts: &[(&str, &str)]) -> Self {
        let contains: Vec<Value> = concepts
            .iter()
            .map(|(code, display)| {
                serde_json::json!({ "system": system, "code": code, "display": display })
            })
            .collect();
        let mut resource = Self::new("ValueSet", id);
        resource.body.insert("status".into(), Value::String("active".into()));
        resource
            .body
            .insert("expansion".into(), serde_json::json!({ "contains": contains }));
        resource
    }

    pub fn is_value_set(&self) -> bool {
        self.resource_type == "ValueSet"
    }
}

pub fn find_contained<'a>(
    contained: &'a [ContainedResource],
    id: &str,
) -> Option<&'a ContainedResource> {
    contained.iter().find(|resource| resource.id == id)
}
