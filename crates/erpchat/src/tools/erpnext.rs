use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use strum::IntoEnumIterator;

use super::catalog::{CatalogError, ToolCatalog};
use super::{parse_arguments, HostTool, ToolId};
use crate::data::{DataSource, Filter, ListQuery};
use crate::errors::{ToolError, ToolResult};
use crate::models::tool::Tool;

/// Rows returned by any listing tool
const LIST_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DateRange {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl DateRange {
    fn filter(&self, field: &str) -> ToolResult<Filter> {
        if self.start_date > self.end_date {
            return Err(ToolError::InvalidParameters(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        Ok(Filter::between(
            field,
            json!(self.start_date.to_string()),
            json!(self.end_date.to_string()),
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InvoiceNumber {
    invoice_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CustomerFilter {
    #[serde(default)]
    customer: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DepartmentFilter {
    #[serde(default)]
    department: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ItemFilter {
    #[serde(default)]
    item_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArguments {}

fn date_range_schema() -> Value {
    json!({
        "type": "object",
        "required": ["start_date", "end_date"],
        "properties": {
            "start_date": {
                "type": "string",
                "format": "date",
                "description": "First day of the period, YYYY-MM-DD."
            },
            "end_date": {
                "type": "string",
                "format": "date",
                "description": "Last day of the period, YYYY-MM-DD."
            }
        },
        "additionalProperties": false
    })
}

fn optional_string_schema(field: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            field: {"type": "string", "description": description}
        },
        "additionalProperties": false
    })
}

/// The schema advertised to the model for each tool
fn describe(id: ToolId) -> Tool {
    let (description, parameters) = match id {
        ToolId::GetSalesInvoices => (
            "List submitted sales invoices posted between two dates.",
            date_range_schema(),
        ),
        ToolId::GetSalesInvoice => (
            "Fetch one sales invoice with all its fields and items.",
            json!({
                "type": "object",
                "required": ["invoice_number"],
                "properties": {
                    "invoice_number": {
                        "type": "string",
                        "description": "The invoice id, e.g. ACC-SINV-2024-00001."
                    }
                },
                "additionalProperties": false
            }),
        ),
        ToolId::GetOpenInvoices => (
            "Total outstanding amount of unpaid submitted sales invoices, optionally for one customer.",
            optional_string_schema("customer", "Customer name to restrict the total to."),
        ),
        ToolId::GetPurchaseInvoices => (
            "List submitted purchase invoices posted between two dates.",
            date_range_schema(),
        ),
        ToolId::GetSalesOrders => (
            "List sales orders with a transaction date between two dates.",
            date_range_schema(),
        ),
        ToolId::GetPurchaseOrders => (
            "List purchase orders with a transaction date between two dates.",
            date_range_schema(),
        ),
        ToolId::GetCustomers => (
            "List customers with their group and territory.",
            json!({"type": "object", "properties": {}, "additionalProperties": false}),
        ),
        ToolId::GetEmployees => (
            "List active employees, optionally in one department.",
            optional_string_schema("department", "Department name, e.g. Sales."),
        ),
        ToolId::GetStockLevels => (
            "Actual quantity on hand per warehouse, optionally for one item.",
            optional_string_schema("item_code", "Item code to look up."),
        ),
        ToolId::GetPayments => (
            "List submitted payment entries posted between two dates.",
            date_range_schema(),
        ),
    };
    Tool::new(id.as_ref(), description, parameters)
}

/// Sum a numeric field, staying integral when every value is an integer and the
/// sum fits in an i64
fn total(rows: &[Value], field: &str) -> Value {
    let integral = rows
        .iter()
        .try_fold(0i64, |sum, row| sum.checked_add(row[field].as_i64()?));
    match integral {
        Some(sum) => json!(sum),
        None => json!(rows.iter().filter_map(|row| row[field].as_f64()).sum::<f64>()),
    }
}

/// A catalog entry answered from the host's business records
pub struct ErpTool {
    id: ToolId,
    tool: Tool,
    source: Arc<dyn DataSource>,
}

impl ErpTool {
    pub fn new(id: ToolId, source: Arc<dyn DataSource>) -> Self {
        Self {
            id,
            tool: describe(id),
            source,
        }
    }

    async fn list(&self, doctype: &str, query: ListQuery) -> ToolResult<Option<Value>> {
        let rows = self
            .source
            .get_list(doctype, &query.limit(LIST_LIMIT))
            .await
            .map_err(|e| ToolError::ExecutionError(e.to_string()))?;
        Ok(Some(Value::Array(rows)))
    }

    async fn dated_list(
        &self,
        arguments: &str,
        doctype: &str,
        date_field: &str,
        fields: &[&str],
        submitted_only: bool,
    ) -> ToolResult<Option<Value>> {
        let range: DateRange = parse_arguments(arguments)?;
        let mut query = ListQuery::new()
            .fields(fields)
            .filter(range.filter(date_field)?);
        if submitted_only {
            query = query.filter(Filter::eq("docstatus", json!(1)));
        }
        self.list(doctype, query).await
    }
}

#[async_trait]
impl HostTool for ErpTool {
    fn tool(&self) -> &Tool {
        &self.tool
    }

    async fn call(&self, arguments: &str) -> ToolResult<Option<Value>> {
        match self.id {
            ToolId::GetSalesInvoices => {
                self.dated_list(
                    arguments,
                    "Sales Invoice",
                    "posting_date",
                    &["name", "customer", "posting_date", "grand_total", "outstanding_amount", "status"],
                    true,
                )
                .await
            }
            ToolId::GetSalesInvoice => {
                let args: InvoiceNumber = parse_arguments(arguments)?;
                self.source
                    .get_doc("Sales Invoice", &args.invoice_number)
                    .await
                    .map_err(|e| ToolError::ExecutionError(e.to_string()))
            }
            ToolId::GetOpenInvoices => {
                let args: CustomerFilter = parse_arguments(arguments)?;
                let mut query = ListQuery::new()
                    .fields(&["name", "outstanding_amount"])
                    .filter(Filter::eq("docstatus", json!(1)))
                    .filter(Filter::gt("outstanding_amount", json!(0)));
                if let Some(customer) = args.customer {
                    query = query.filter(Filter::eq("customer", json!(customer)));
                }
                // Every open invoice counts toward the total, so no row limit here
                let rows = self
                    .source
                    .get_list("Sales Invoice", &query)
                    .await
                    .map_err(|e| ToolError::ExecutionError(e.to_string()))?;
                Ok(Some(total(&rows, "outstanding_amount")))
            }
            ToolId::GetPurchaseInvoices => {
                self.dated_list(
                    arguments,
                    "Purchase Invoice",
                    "posting_date",
                    &["name", "supplier", "posting_date", "grand_total", "outstanding_amount", "status"],
                    true,
                )
                .await
            }
            ToolId::GetSalesOrders => {
                self.dated_list(
                    arguments,
                    "Sales Order",
                    "transaction_date",
                    &["name", "customer", "transaction_date", "grand_total", "status"],
                    false,
                )
                .await
            }
            ToolId::GetPurchaseOrders => {
                self.dated_list(
                    arguments,
                    "Purchase Order",
                    "transaction_date",
                    &["name", "supplier", "transaction_date", "grand_total", "status"],
                    false,
                )
                .await
            }
            ToolId::GetCustomers => {
                parse_arguments::<NoArguments>(arguments)?;
                let query = ListQuery::new().fields(&[
                    "name",
                    "customer_name",
                    "customer_group",
                    "territory",
                ]);
                self.list("Customer", query).await
            }
            ToolId::GetEmployees => {
                let args: DepartmentFilter = parse_arguments(arguments)?;
                let mut query = ListQuery::new()
                    .fields(&["name", "employee_name", "department", "designation"])
                    .filter(Filter::eq("status", json!("Active")));
                if let Some(department) = args.department {
                    query = query.filter(Filter::eq("department", json!(department)));
                }
                self.list("Employee", query).await
            }
            ToolId::GetStockLevels => {
                let args: ItemFilter = parse_arguments(arguments)?;
                let mut query =
                    ListQuery::new().fields(&["item_code", "warehouse", "actual_qty"]);
                if let Some(item_code) = args.item_code {
                    query = query.filter(Filter::eq("item_code", json!(item_code)));
                }
                self.list("Bin", query).await
            }
            ToolId::GetPayments => {
                self.dated_list(
                    arguments,
                    "Payment Entry",
                    "posting_date",
                    &["name", "party", "payment_type", "paid_amount", "posting_date"],
                    true,
                )
                .await
            }
        }
    }
}

/// The standard catalog, every tool answered from `source`
pub fn erpnext_catalog(source: Arc<dyn DataSource>) -> Result<ToolCatalog, CatalogError> {
    ToolId::iter()
        .fold(ToolCatalog::builder(), |builder, id| {
            builder.register(id, Arc::new(ErpTool::new(id, Arc::clone(&source))))
        })
        .build()
}
