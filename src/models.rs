use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Customer classification used by the dashboard filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerCategory {
    Prospective,
    Current,
    Inactive,
}

impl CustomerCategory {
    /// Case-insensitive parse, used for query filters and the bulk update.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prospective" => Some(Self::Prospective),
            "current" => Some(Self::Current),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prospective => "Prospective",
            Self::Current => "Current",
            Self::Inactive => "Inactive",
        }
    }
}

impl std::fmt::Display for CustomerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance label on a financial entry. Advisory only - it does not
/// constrain which record collections are populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinancialCategory {
    #[serde(rename = "Transaction Records")]
    TransactionRecords,
    Expenses,
    Banking,
    #[serde(rename = "Finance Reports")]
    FinanceReports,
    #[serde(rename = "Tax Documents")]
    TaxDocuments,
}

impl FinancialCategory {
    /// Case-insensitive parse for query filters.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transaction records" => Some(Self::TransactionRecords),
            "expenses" => Some(Self::Expenses),
            "banking" => Some(Self::Banking),
            "finance reports" => Some(Self::FinanceReports),
            "tax documents" => Some(Self::TaxDocuments),
            _ => None,
        }
    }
}

/// A past order nested in a customer profile. At least one identifying
/// field is expected but not enforced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    pub order_id: Option<String>,
    pub order_number: Option<String>,
    pub date: Option<String>,
    pub amount: Option<f64>,
    pub description: Option<String>,
}

/// A customer profile populated opportunistically by extraction.
///
/// Every field except `id` may be absent. Absence (null) means "not yet
/// known" and is distinct from an empty string or list, so optional fields
/// serialize as explicit nulls rather than being skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub company: Option<String>,
    pub birthday: Option<String>,
    pub interests: Option<Vec<String>>,
    pub prev_orders: Option<Vec<Order>>,
    pub reward_points: Option<i64>,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
    pub payment_last4: Option<String>,
    pub category: Option<CustomerCategory>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// One entry in a financial collection: a type tag plus the usual
/// amount/currency/date/description fields, any of which may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub record_type: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

/// A financial entry with up to five parallel record collections. Multiple
/// collections may be non-empty at once regardless of `category`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialData {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: Option<String>,
    pub category: Option<FinancialCategory>,
    pub transactions: Option<Vec<FinancialRecord>>,
    pub expenses: Option<Vec<FinancialRecord>>,
    pub bank_statements: Option<Vec<FinancialRecord>>,
    pub finance_reports: Option<Vec<FinancialRecord>>,
    pub tax_documents: Option<Vec<FinancialRecord>>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Metadata kept for a file the user uploaded alongside a chat message.
/// The file body itself is opaque text forwarded to the agent runtime;
/// only a preview is retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub content_preview: String,
    pub file_type: Option<String>,
    pub timestamp: DateTime<Utc>,
}

const PREVIEW_LIMIT: usize = 500;

impl UploadedFile {
    pub fn from_content(content: &str, file_type: Option<String>) -> Self {
        let preview = match content.char_indices().nth(PREVIEW_LIMIT) {
            Some((idx, _)) => content[..idx].to_string(),
            None => content.to_string(),
        };
        Self {
            content_preview: preview,
            file_type,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of conversation history. Append-only per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryTurn {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Aggregate counts over the customer collection.
/// `prospective + current + inactive + uncategorized == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerStats {
    pub total: usize,
    pub prospective: usize,
    pub current: usize,
    pub inactive: usize,
    pub uncategorized: usize,
}

/// A single entity reported back by the agent runtime, tagged by `type`.
/// Payloads that carry an unknown tag or fail to parse are preserved
/// verbatim in `Unrecognized` instead of being dropped.
#[derive(Debug, Clone)]
pub enum ExtractedRecord {
    Customer(Customer),
    Financial(FinancialData),
    UploadedFile(UploadedFile),
    Unrecognized(Value),
}

impl ExtractedRecord {
    fn tag(&self) -> &'static str {
        match self {
            Self::Customer(_) => "customer",
            Self::Financial(_) => "financial",
            Self::UploadedFile(_) => "uploaded_file",
            Self::Unrecognized(_) => "unrecognized",
        }
    }

    /// Classify a raw JSON object by its `type` tag, falling back to
    /// `Unrecognized` rather than failing the whole batch.
    pub fn from_value(value: Value) -> Self {
        let tag = value.get("type").and_then(|t| t.as_str()).unwrap_or("");
        match tag {
            "customer" => match serde_json::from_value::<Customer>(value.clone()) {
                Ok(customer) => Self::Customer(customer),
                Err(_) => Self::Unrecognized(value),
            },
            "financial" => match serde_json::from_value::<FinancialData>(value.clone()) {
                Ok(financial) => Self::Financial(financial),
                Err(_) => Self::Unrecognized(value),
            },
            "uploaded_file" => match serde_json::from_value::<UploadedFile>(value.clone()) {
                Ok(file) => Self::UploadedFile(file),
                Err(_) => Self::Unrecognized(value),
            },
            _ => Self::Unrecognized(value),
        }
    }
}

impl Serialize for ExtractedRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::Error;

        let mut value = match self {
            Self::Customer(c) => serde_json::to_value(c).map_err(S::Error::custom)?,
            Self::Financial(f) => serde_json::to_value(f).map_err(S::Error::custom)?,
            Self::UploadedFile(u) => serde_json::to_value(u).map_err(S::Error::custom)?,
            Self::Unrecognized(v) => return v.serialize(serializer),
        };
        if let Value::Object(ref mut map) = value {
            map.insert("type".to_string(), Value::String(self.tag().to_string()));
        }
        value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ExtractedRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!(
            CustomerCategory::parse("PROSPECTIVE"),
            Some(CustomerCategory::Prospective)
        );
        assert_eq!(
            CustomerCategory::parse("current"),
            Some(CustomerCategory::Current)
        );
        assert_eq!(
            CustomerCategory::parse(" Inactive "),
            Some(CustomerCategory::Inactive)
        );
        assert_eq!(CustomerCategory::parse("vip"), None);
        assert_eq!(CustomerCategory::parse(""), None);
    }

    #[test]
    fn customer_missing_fields_deserialize_as_null() {
        let customer: Customer =
            serde_json::from_str(r#"{"name": "John Doe", "email": "john@example.com"}"#).unwrap();
        assert_eq!(customer.name.as_deref(), Some("John Doe"));
        assert_eq!(customer.email.as_deref(), Some("john@example.com"));
        assert!(customer.phone.is_none());
        assert!(customer.category.is_none());

        // Absent fields still appear as explicit nulls on the wire.
        let json = serde_json::to_value(&customer).unwrap();
        assert!(json.get("phone").unwrap().is_null());
    }

    #[test]
    fn financial_category_uses_display_names() {
        let json = serde_json::to_value(FinancialCategory::TransactionRecords).unwrap();
        assert_eq!(json, serde_json::json!("Transaction Records"));
        let parsed: FinancialCategory = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, FinancialCategory::TransactionRecords);
    }

    #[test]
    fn extracted_record_dispatches_on_type_tag() {
        let record = ExtractedRecord::from_value(serde_json::json!({
            "type": "customer",
            "name": "Ada"
        }));
        assert!(matches!(
            record,
            ExtractedRecord::Customer(ref c) if c.name.as_deref() == Some("Ada")
        ));

        let record = ExtractedRecord::from_value(serde_json::json!({
            "type": "inventory",
            "sku": "X-1"
        }));
        assert!(matches!(record, ExtractedRecord::Unrecognized(_)));
    }

    #[test]
    fn extracted_record_round_trips_tag() {
        let record = ExtractedRecord::Customer(Customer {
            name: Some("Ada".to_string()),
            ..Default::default()
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json.get("type"), Some(&serde_json::json!("customer")));

        let back: ExtractedRecord = serde_json::from_value(json).unwrap();
        assert!(matches!(back, ExtractedRecord::Customer(_)));
    }

    #[test]
    fn uploaded_file_preview_is_capped() {
        let content = "x".repeat(2000);
        let file = UploadedFile::from_content(&content, Some("txt".to_string()));
        assert_eq!(file.content_preview.len(), 500);

        let short = UploadedFile::from_content("hello", None);
        assert_eq!(short.content_preview, "hello");
    }
}
