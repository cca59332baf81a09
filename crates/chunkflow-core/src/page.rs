//! One page of fetched results, as returned by a [`Fetcher`](crate::fetcher::Fetcher).

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ChunkError;

/// The result of a single fetch call.
///
/// A page either carries `values` (possibly empty, meaning "nothing on this
/// page, keep paging") or signals `done`. A page with `values: None` is also
/// treated as the end of the data.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T, M> {
    /// Items on this page, in delivery order.
    pub values: Option<Vec<T>>,
    /// `true` when there is nothing more to fetch.
    pub done: bool,
    /// New paging state for the next call. `None` keeps the current meta.
    pub meta: Option<M>,
}

impl<T, M> Page<T, M> {
    /// A page of values with more to come.
    pub fn values(values: Vec<T>) -> Self {
        Self {
            values: Some(values),
            done: false,
            meta: None,
        }
    }

    /// An empty page that is not the end of the data.
    pub fn empty() -> Self {
        Self::values(Vec::new())
    }

    /// The terminal page.
    pub fn done() -> Self {
        Self {
            values: None,
            done: true,
            meta: None,
        }
    }

    /// Attach new paging state.
    pub fn with_meta(mut self, meta: M) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Set the done flag, keeping whatever values are on the page.
    pub fn finished(mut self, done: bool) -> Self {
        self.done = done;
        self
    }

    /// Number of values carried, 0 if none.
    pub fn len(&self) -> usize {
        self.values.as_ref().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: DeserializeOwned, M: DeserializeOwned> Page<T, M> {
    /// Decode a loosely-typed JSON page of the form
    /// `{ "values": [...], "done": bool, "meta": ... }`.
    ///
    /// - `null` decodes to `Ok(None)` (no result at all).
    /// - A missing `values` field decodes to `values: None`.
    /// - Any other non-array `values`, `null` included, on a page that is not
    ///   `done` is a [`ChunkError::Shape`]; on a `done` page it is ignored.
    /// - A falsy `meta` (`null`, `false`, `0`, `""`) keeps the current meta.
    pub fn from_json(v: Value) -> Result<Option<Self>, ChunkError> {
        let mut obj = match v {
            Value::Null => return Ok(None),
            Value::Object(obj) => obj,
            _ => {
                return Ok(Some(Self {
                    values: None,
                    done: false,
                    meta: None,
                }))
            }
        };

        let done = obj.get("done").map(is_truthy).unwrap_or(false);

        let values = match obj.remove("values") {
            None => None,
            Some(Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    let decoded = serde_json::from_value(item).map_err(|e| ChunkError::Shape {
                        found: format!("undecodable item at index {i} ({e})"),
                    })?;
                    out.push(decoded);
                }
                Some(out)
            }
            Some(_) if done => None,
            Some(other) => {
                return Err(ChunkError::Shape {
                    found: json_type_name(&other).to_string(),
                })
            }
        };

        let meta = match obj.remove("meta") {
            Some(m) if is_truthy(&m) => Some(
                serde_json::from_value(m)
                    .map_err(|e| ChunkError::Shape { found: format!("undecodable meta ({e})") })?,
            ),
            _ => None,
        };

        Ok(Some(Self { values, done, meta }))
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
