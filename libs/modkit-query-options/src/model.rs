//! Read-only schema context the options are parsed against.
//!
//! `EdmModel` is built once at startup and shared between requests through
//! `Arc`. A `QueryContext` binds it to the element type (and navigation
//! source) addressed by a request, together with the expression grammar.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::grammar::{ExpressionGrammar, ODataGrammar};

/// Logical property types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    String,
    I64,
    F64,
    Bool,
    Uuid,
    DateTimeUtc,
    Date,
    Time,
    Decimal,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => write!(f, "String"),
            FieldKind::I64 => write!(f, "I64"),
            FieldKind::F64 => write!(f, "F64"),
            FieldKind::Bool => write!(f, "Bool"),
            FieldKind::Uuid => write!(f, "Uuid"),
            FieldKind::DateTimeUtc => write!(f, "DateTimeUtc"),
            FieldKind::Date => write!(f, "Date"),
            FieldKind::Time => write!(f, "Time"),
            FieldKind::Decimal => write!(f, "Decimal"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub kind: FieldKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationProperty {
    pub name: String,
    /// Name of the entity type on the other end.
    pub target: String,
    pub collection: bool,
}

/// A structured type with key, properties and navigation properties.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct EntityType {
    name: String,
    key: Vec<String>,
    properties: Vec<Property>,
    navigation: Vec<NavigationProperty>,
}

impl EntityType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a key property. Key properties are also regular properties.
    pub fn key(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        self.key.push(name.clone());
        self.properties.push(Property { name, kind });
        self
    }

    pub fn property(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.properties.push(Property {
            name: name.into(),
            kind,
        });
        self
    }

    /// Single-valued navigation property.
    pub fn reference(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.navigation.push(NavigationProperty {
            name: name.into(),
            target: target.into(),
            collection: false,
        });
        self
    }

    /// Collection-valued navigation property.
    pub fn collection(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.navigation.push(NavigationProperty {
            name: name.into(),
            target: target.into(),
            collection: true,
        });
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn key_properties(&self) -> &[String] {
        &self.key
    }

    #[must_use]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    #[must_use]
    pub fn navigation_properties(&self) -> &[NavigationProperty] {
        &self.navigation
    }

    /// Case-insensitive structural property lookup.
    #[must_use]
    pub fn find_property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Case-insensitive navigation property lookup.
    #[must_use]
    pub fn find_navigation(&self, name: &str) -> Option<&NavigationProperty> {
        self.navigation
            .iter()
            .find(|n| n.name.eq_ignore_ascii_case(name))
    }
}

/// The entity model: entity types and the entity sets exposing them.
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct EdmModel {
    types: HashMap<String, EntityType>,
    entity_sets: HashMap<String, String>,
}

impl EdmModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity_type(mut self, ty: EntityType) -> Self {
        self.types.insert(ty.name.to_lowercase(), ty);
        self
    }

    /// Expose `type_name` as entity set `set_name`.
    pub fn entity_set(mut self, set_name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.entity_sets
            .insert(set_name.into().to_lowercase(), type_name.into());
        self
    }

    #[must_use]
    pub fn find_type(&self, name: &str) -> Option<&EntityType> {
        self.types.get(&name.to_lowercase())
    }

    #[must_use]
    pub fn find_entity_set(&self, name: &str) -> Option<&EntityType> {
        self.entity_sets
            .get(&name.to_lowercase())
            .and_then(|ty| self.find_type(ty))
    }
}

/// Schema context of one request target.
#[derive(Clone)]
pub struct QueryContext {
    model: Arc<EdmModel>,
    element_type: EntityType,
    navigation_source: Option<String>,
    grammar: Arc<dyn ExpressionGrammar>,
}

impl QueryContext {
    pub fn builder() -> QueryContextBuilder {
        QueryContextBuilder::default()
    }

    #[must_use]
    pub fn model(&self) -> &EdmModel {
        &self.model
    }

    #[must_use]
    pub fn element_type(&self) -> &EntityType {
        &self.element_type
    }

    #[must_use]
    pub fn navigation_source(&self) -> Option<&str> {
        self.navigation_source.as_deref()
    }

    #[must_use]
    pub fn grammar(&self) -> &dyn ExpressionGrammar {
        self.grammar.as_ref()
    }
}

impl fmt::Debug for QueryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryContext")
            .field("element_type", &self.element_type.name)
            .field("navigation_source", &self.navigation_source)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
#[must_use]
pub struct QueryContextBuilder {
    model: Option<Arc<EdmModel>>,
    element_type: Option<String>,
    navigation_source: Option<String>,
    grammar: Option<Arc<dyn ExpressionGrammar>>,
}

impl QueryContextBuilder {
    pub fn model(mut self, model: Arc<EdmModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn element_type(mut self, name: impl Into<String>) -> Self {
        self.element_type = Some(name.into());
        self
    }

    /// Target an entity set; its element type becomes the element type.
    pub fn navigation_source(mut self, entity_set: impl Into<String>) -> Self {
        self.navigation_source = Some(entity_set.into());
        self
    }

    pub fn grammar(mut self, grammar: Arc<dyn ExpressionGrammar>) -> Self {
        self.grammar = Some(grammar);
        self
    }

    /// Freeze the context.
    ///
    /// # Errors
    /// - `Error::ArgumentNull` when the model is missing, or when neither an
    ///   element type nor a navigation source was given
    /// - `Error::UnknownSchemaElement` when the named type or entity set does
    ///   not exist in the model
    pub fn build(self) -> Result<Arc<QueryContext>, Error> {
        let model = self.model.ok_or(Error::ArgumentNull("model"))?;

        let element_type = match (self.element_type, self.navigation_source.as_deref()) {
            (Some(name), _) => model.find_type(&name).cloned().ok_or_else(|| {
                Error::UnknownSchemaElement {
                    argument: "element_type",
                    name,
                }
            })?,
            (None, Some(set)) => model.find_entity_set(set).cloned().ok_or_else(|| {
                Error::UnknownSchemaElement {
                    argument: "navigation_source",
                    name: set.to_owned(),
                }
            })?,
            (None, None) => return Err(Error::ArgumentNull("element_type")),
        };

        Ok(Arc::new(QueryContext {
            model,
            element_type,
            navigation_source: self.navigation_source,
            grammar: self.grammar.unwrap_or_else(|| Arc::new(ODataGrammar)),
        }))
    }
}
