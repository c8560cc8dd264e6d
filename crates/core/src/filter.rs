//! The filter capability set consumed by the loader, and the loadable
//! definition a compiler hands to a factory.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A compiled, instantiated request filter.
///
/// The loader only ever reads [`filter_type`](Filter::filter_type) and
/// [`priority`](Filter::priority). Execution belongs to the request pipeline,
/// which reaches its concrete filter type through [`as_any`](Filter::as_any).
pub trait Filter: Send + Sync {
    /// Filter name, usually the source file stem or the inline name.
    fn name(&self) -> &str;

    /// Pipeline phase this filter belongs to (e.g. `pre`, `route`, `post`).
    fn filter_type(&self) -> &str;

    /// Ordering within a phase. Lower runs earlier.
    fn priority(&self) -> i32;

    /// Opaque execution handle for the pipeline.
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a live filter instance.
pub type FilterRef = Arc<dyn Filter>;

impl fmt::Debug for dyn Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("name", &self.name())
            .field("type", &self.filter_type())
            .field("priority", &self.priority())
            .finish()
    }
}

/// Output of a compiler: everything a factory needs to build an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDefinition {
    /// Filled from the file stem or inline name when omitted in source.
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub filter_type: String,
    #[serde(default)]
    pub priority: i32,
    /// Base/template definitions are valid but never instantiated.
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub description: Option<String>,
    /// Opaque to the loader; interpreted by the factory.
    #[serde(default)]
    pub params: serde_yaml::Value,
}

impl FilterDefinition {
    pub fn new(name: impl Into<String>, filter_type: impl Into<String>, priority: i32) -> Self {
        Self {
            name: name.into(),
            filter_type: filter_type.into(),
            priority,
            is_abstract: false,
            description: None,
            params: serde_yaml::Value::Null,
        }
    }

    /// Mark this definition as a non-instantiable template.
    pub fn into_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn is_instantiable(&self) -> bool {
        !self.is_abstract
    }
}
