use serde_json::Value;

/// A table row as returned by the store.
pub type Row = serde_json::Map<String, Value>;

/// Equality filter on a single column.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Whether `row` satisfies the filter, comparing textual forms so that an
    /// integer id matches its string spelling.
    pub fn matches(&self, row: &Row) -> bool {
        row.get(&self.column)
            .and_then(value_text)
            .is_some_and(|text| text == self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

/// Select query: a column projection, equality filters and an optional order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub columns: Option<Vec<String>>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl Query {
    /// Every column of every row.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn order_by(mut self, column: impl Into<String>, descending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            descending,
        });
        self
    }
}

/// Textual form of a scalar JSON value; `None` for null, arrays and objects.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
