use itertools::Itertools;
use std::sync::Arc;

use crate::error::CmisError;
use crate::model::TypeDefinition;

/// A resolved column binding: the property id plus the type definition it
/// was found on.
#[derive(Debug, Clone)]
pub struct ResolvedColumn {
    pub property_id: String,
    pub type_definition: Arc<TypeDefinition>,
}

/// A column named in a query SELECT list. Starts out as query names from
/// the statement text and is bound to a concrete property exactly once;
/// resolution is monotonic and a second bind is a programming error.
#[derive(Debug, Clone)]
pub struct ColumnReference {
    type_query_name: Option<String>,
    property_query_name: String,
    resolved: Option<ResolvedColumn>,
}

impl ColumnReference {
    pub fn new(property_query_name: impl Into<String>) -> Self {
        Self {
            type_query_name: None,
            property_query_name: property_query_name.into(),
            resolved: None,
        }
    }

    pub fn qualified(
        type_query_name: impl Into<String>,
        property_query_name: impl Into<String>,
    ) -> Self {
        Self {
            type_query_name: Some(type_query_name.into()),
            property_query_name: property_query_name.into(),
            resolved: None,
        }
    }

    pub fn type_query_name(&self) -> Option<&str> {
        self.type_query_name.as_deref()
    }

    pub fn property_query_name(&self) -> &str {
        &self.property_query_name
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    pub fn resolved(&self) -> Option<&ResolvedColumn> {
        self.resolved.as_ref()
    }

    pub fn bind(mut self, resolved: ResolvedColumn) -> Result<Self, CmisError> {
        if self.resolved.is_some() {
            return Err(CmisError::illegal_state(format!(
                "Column already resolved: {}",
                self.property_query_name
            )));
        }
        self.resolved = Some(resolved);
        Ok(self)
    }
}

/// SELECT list and FROM clause of a parsed statement, before and after
/// column resolution.
#[derive(Debug, Clone, Default)]
pub struct ParsedQuery {
    pub columns: Vec<ColumnReference>,
    pub from: Vec<String>,
}

/// Binds every column of `query` against `types`, the type definitions the
/// FROM clause names. Qualified columns resolve against their qualifier; a
/// bare column resolves only when exactly one queried type carries it.
pub fn resolve_columns(
    query: &mut ParsedQuery,
    types: &[Arc<TypeDefinition>],
) -> Result<(), CmisError> {
    let columns = std::mem::take(&mut query.columns);
    let mut resolved_columns = Vec::with_capacity(columns.len());
    for column in columns {
        let resolved = match column.type_query_name() {
            Some(qualifier) => {
                let type_def = types
                    .iter()
                    .find(|t| t.query_name == qualifier)
                    .ok_or_else(|| {
                        CmisError::invalid_argument(format!(
                            "Unknown type qualifier '{}' for column '{}'",
                            qualifier,
                            column.property_query_name()
                        ))
                    })?;
                bind_on_type(&column, type_def)?
            }
            None => {
                let candidates: Vec<&Arc<TypeDefinition>> = types
                    .iter()
                    .filter(|t| t.property_by_query_name(column.property_query_name()).is_some())
                    .collect();
                match candidates.as_slice() {
                    [type_def] => bind_on_type(&column, type_def)?,
                    [] => {
                        return Err(CmisError::invalid_argument(format!(
                            "Column '{}' is not a property of any queried type",
                            column.property_query_name()
                        )))
                    }
                    _ => {
                        return Err(CmisError::invalid_argument(format!(
                            "Column '{}' is ambiguous, candidates: {}",
                            column.property_query_name(),
                            candidates.iter().map(|t| t.query_name.as_str()).join(", ")
                        )))
                    }
                }
            }
        };
        resolved_columns.push(resolved);
    }
    query.columns = resolved_columns;
    Ok(())
}

fn bind_on_type(
    column: &ColumnReference,
    type_def: &Arc<TypeDefinition>,
) -> Result<ColumnReference, CmisError> {
    let property = type_def
        .property_by_query_name(column.property_query_name())
        .ok_or_else(|| {
            CmisError::invalid_argument(format!(
                "Property '{}' is not defined on type '{}'",
                column.property_query_name(),
                type_def.query_name
            ))
        })?;
    column.clone().bind(ResolvedColumn {
        property_id: property.id.clone(),
        type_definition: type_def.clone(),
    })
}
