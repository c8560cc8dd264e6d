//! Building live filter instances from compiled definitions.

use std::any::Any;
use std::sync::Arc;

use sieve_core::{Filter, FilterDefinition, FilterError, FilterRef, Result};

/// Instantiates a [`FilterDefinition`].
///
/// Any `Fn(&FilterDefinition) -> Result<FilterRef>` closure is a factory, so
/// callers can plug in their own filter types without a dedicated struct.
pub trait FilterFactory: Send + Sync {
    fn new_instance(&self, definition: &FilterDefinition) -> Result<FilterRef>;
}

impl<F> FilterFactory for F
where
    F: Fn(&FilterDefinition) -> Result<FilterRef> + Send + Sync,
{
    fn new_instance(&self, definition: &FilterDefinition) -> Result<FilterRef> {
        self(definition)
    }
}

/// Builds a [`DeclarativeFilter`] for every concrete definition.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFactory;

impl FilterFactory for DefaultFactory {
    fn new_instance(&self, definition: &FilterDefinition) -> Result<FilterRef> {
        if !definition.is_instantiable() {
            return Err(FilterError::instantiation(
                &definition.name,
                "abstract filter definitions cannot be instantiated",
            ));
        }
        Ok(Arc::new(DeclarativeFilter::new(definition.clone())))
    }
}

/// A filter whose behaviour is described entirely by its definition's params.
///
/// The pipeline downcasts to this type via [`Filter::as_any`] and interprets
/// [`params`](DeclarativeFilter::params) itself.
#[derive(Debug, Clone)]
pub struct DeclarativeFilter {
    definition: FilterDefinition,
}

impl DeclarativeFilter {
    pub fn new(definition: FilterDefinition) -> Self {
        Self { definition }
    }

    pub fn definition(&self) -> &FilterDefinition {
        &self.definition
    }

    pub fn params(&self) -> &serde_yaml::Value {
        &self.definition.params
    }
}

impl Filter for DeclarativeFilter {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn filter_type(&self) -> &str {
        &self.definition.filter_type
    }

    fn priority(&self) -> i32 {
        self.definition.priority
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
