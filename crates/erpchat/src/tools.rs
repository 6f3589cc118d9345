pub mod catalog;
pub mod erpnext;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::errors::{ToolError, ToolResult};
use crate::models::tool::Tool;

/// Every lookup the assistant may request. The model only ever sees these names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum ToolId {
    GetSalesInvoices,
    GetSalesInvoice,
    GetOpenInvoices,
    GetPurchaseInvoices,
    GetSalesOrders,
    GetPurchaseOrders,
    GetCustomers,
    GetEmployees,
    GetStockLevels,
    GetPayments,
}

/// A host-side implementation of one catalog entry
#[async_trait]
pub trait HostTool: Send + Sync {
    /// The schema advertised to the model
    fn tool(&self) -> &Tool;

    /// Run the tool with the model's raw JSON arguments. `Ok(None)` means the lookup
    /// found nothing worth reporting.
    async fn call(&self, arguments: &str) -> ToolResult<Option<Value>>;
}

/// Decode raw tool arguments into the tool's typed argument struct
pub fn parse_arguments<T: DeserializeOwned>(arguments: &str) -> ToolResult<T> {
    let raw = if arguments.trim().is_empty() {
        "{}"
    } else {
        arguments
    };
    serde_json::from_str(raw).map_err(|e| ToolError::InvalidParameters(e.to_string()))
}

/// Text sent back to the model for a tool's return value
pub fn render_result(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct CustomerArgs {
        customer: String,
    }

    #[test]
    fn test_tool_names_are_snake_case() {
        assert_eq!(ToolId::GetOpenInvoices.as_ref(), "get_open_invoices");
        assert_eq!(ToolId::from_str("get_stock_levels").unwrap(), ToolId::GetStockLevels);
        assert!(ToolId::from_str("drop_database").is_err());
        assert_eq!(ToolId::iter().count(), 10);
    }

    #[test]
    fn test_parse_arguments() {
        let args: CustomerArgs = parse_arguments(r#"{"customer": "Acme"}"#).unwrap();
        assert_eq!(args.customer, "Acme");
    }

    #[test]
    fn test_parse_arguments_rejects_bad_input() {
        let unknown = parse_arguments::<CustomerArgs>(r#"{"customer": "Acme", "x": 1}"#);
        assert!(matches!(unknown, Err(ToolError::InvalidParameters(_))));

        let wrong_type = parse_arguments::<CustomerArgs>(r#"{"customer": 5}"#);
        assert!(matches!(wrong_type, Err(ToolError::InvalidParameters(_))));

        let not_json = parse_arguments::<CustomerArgs>("{customer");
        assert!(matches!(not_json, Err(ToolError::InvalidParameters(_))));
    }

    #[test]
    fn test_render_result() {
        assert_eq!(render_result(&json!(12500)), "12500");
        assert_eq!(render_result(&json!("done")), "done");
        assert_eq!(render_result(&json!([{"name": "A"}])), r#"[{"name":"A"}]"#);
    }
}
