//! Wire types shared by the DataByte collection server and its clients.
//!
//! A [`Record`] is an opaque JSON object with a stable `id`; the server never
//! reshapes it, so clients receive exactly what the content store holds.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Upper bound applied to every requested page size.
pub const MAX_PAGE_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record is missing an `id` field")]
    MissingId,
    #[error("record `id` must be a string or an integer")]
    InvalidId,
}

/// One content item of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Record {
    id: String,
    fields: Map<String, Value>,
}

impl Record {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw field value, including `id` itself.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Field value when it is a JSON string.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl TryFrom<Map<String, Value>> for Record {
    type Error = RecordError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let id = match fields.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(number)) if number.is_i64() || number.is_u64() => number.to_string(),
            Some(_) => return Err(RecordError::InvalidId),
            None => return Err(RecordError::MissingId),
        };
        Ok(Self { id, fields })
    }
}

impl From<Record> for Map<String, Value> {
    fn from(record: Record) -> Self {
        record.fields
    }
}

/// Pagination metadata attached to every page of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_more: bool,
}

impl Pagination {
    /// Derive page counts for a `limit`-sized window at `page` over `total` items.
    ///
    /// `limit` of zero is treated as one so the page count stays defined.
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let limit = limit.max(1);
        let total_pages = total.div_ceil(limit);
        Self {
            page,
            limit,
            total,
            total_pages,
            has_more: page < total_pages,
        }
    }

    /// Metadata describing an unpaginated collection delivered in one piece.
    pub fn single_page(total: usize) -> Self {
        Self::new(1, total, total)
    }

    /// Zero-based index of the first item in this window.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// One page of a filtered, sorted collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub data: Vec<Record>,
    pub pagination: Pagination,
}

impl PageResult {
    pub fn single_page(data: Vec<Record>) -> Self {
        let pagination = Pagination::single_page(data.len());
        Self { data, pagination }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
}
