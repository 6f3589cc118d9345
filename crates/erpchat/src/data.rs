//! Read access to the host application's business records
//!
//! Tools never talk to the database directly; they describe what they need as a
//! doctype plus a [`ListQuery`] and leave the transport to a [`DataSource`].
pub mod frappe;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Between,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Gt => ">",
            FilterOp::Lt => "<",
            FilterOp::Ge => ">=",
            FilterOp::Le => "<=",
            FilterOp::Between => "between",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new<S: Into<String>>(field: S, op: FilterOp, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    pub fn eq<S: Into<String>>(field: S, value: Value) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    pub fn gt<S: Into<String>>(field: S, value: Value) -> Self {
        Self::new(field, FilterOp::Gt, value)
    }

    /// Inclusive on both ends
    pub fn between<S: Into<String>>(field: S, from: Value, to: Value) -> Self {
        Self::new(field, FilterOp::Between, json!([from, to]))
    }

    /// The `[field, op, value]` triple used by the Frappe REST API
    pub fn to_frappe(&self) -> Value {
        json!([self.field, self.op.as_str(), self.value])
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    /// Empty means every field
    pub fields: Vec<String>,
    /// `None` means no limit
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Source of host-application records, addressed by doctype
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn get_list(&self, doctype: &str, query: &ListQuery) -> Result<Vec<Value>>;

    /// `Ok(None)` when no record has that name
    async fn get_doc(&self, doctype: &str, name: &str) -> Result<Option<Value>>;
}
