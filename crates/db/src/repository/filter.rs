//! Task filtering and listing queries
//!
//! Turns the loosely-typed `where`, `sort`, `select`, `skip`, `limit` and
//! `count` request parameters into an explicit [`TaskQuery`] (predicate
//! tree, ordering list, field mask) and executes it with [`TaskLister`].
//!
//! Parsing is lenient: a malformed parameter falls back to its default
//! instead of producing an error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use tracing::{debug, trace};

use crate::error::DbResult;
use crate::models::{Task, TaskRow, parse_deadline};

/// Number of tasks returned when no usable `limit` is supplied
pub const DEFAULT_LIMIT: u64 = 100;

/// Largest `LIMIT`/`START` value the store accepts (a signed 64-bit integer)
const MAX_PAGE_VALUE: u64 = i64::MAX as u64;

/// Task fields stored as datetimes; filter values for them must parse as dates
const DATETIME_FIELDS: &[&str] = &["deadline", "dateCreated"];

/// Field name used on the wire for the record key
const WIRE_ID: &str = "_id";

/// Comparison operator inside a [`TaskFilter::Compare`] node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
}

impl CompareOp {
    fn from_operator(op: &str) -> Option<Self> {
        match op {
            "$eq" => Some(CompareOp::Eq),
            "$ne" => Some(CompareOp::Ne),
            "$gt" => Some(CompareOp::Gt),
            "$gte" => Some(CompareOp::Gte),
            "$lt" => Some(CompareOp::Lt),
            "$lte" => Some(CompareOp::Lte),
            "$in" => Some(CompareOp::In),
            "$nin" => Some(CompareOp::Nin),
            _ => None,
        }
    }

    fn infix(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::In => "INSIDE",
            CompareOp::Nin => "NOTINSIDE",
        }
    }
}

/// Predicate tree over task fields
///
/// `field` names are plain identifiers; `id` addresses the record key.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TaskFilter {
    /// Matches every task
    #[default]
    All,
    And(Vec<TaskFilter>),
    Or(Vec<TaskFilter>),
    /// Matches tasks that match none of the branches
    Nor(Vec<TaskFilter>),
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    /// Field presence (`$exists`)
    Exists { field: String, present: bool },
}

impl TaskFilter {
    /// Equality on a single field
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        TaskFilter::Compare {
            field: field.into(),
            op: CompareOp::Eq,
            value: value.into(),
        }
    }

    /// Parse a JSON-encoded `where` parameter.
    ///
    /// Absent or malformed input yields [`TaskFilter::All`].
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return TaskFilter::All;
        };

        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::from_json(&value).unwrap_or_else(|| {
                debug!("Ignoring malformed where clause: {}", raw);
                TaskFilter::All
            }),
            Err(_) => {
                debug!("Ignoring unparseable where clause: {}", raw);
                TaskFilter::All
            }
        }
    }

    /// Build a filter from a decoded JSON document.
    ///
    /// Returns `None` if any part of the document is not understood.
    pub fn from_json(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let mut clauses = map
            .iter()
            .map(|(key, value)| Self::parse_entry(key, value))
            .collect::<Option<Vec<_>>>()?;

        Some(match clauses.len() {
            0 => TaskFilter::All,
            1 => clauses.remove(0),
            _ => TaskFilter::And(clauses),
        })
    }

    fn parse_entry(key: &str, value: &Value) -> Option<Self> {
        match key {
            "$and" | "$or" | "$nor" => {
                let branches = value
                    .as_array()
                    .filter(|items| !items.is_empty())?
                    .iter()
                    .map(Self::from_json)
                    .collect::<Option<Vec<_>>>()?;
                Some(match key {
                    "$and" => TaskFilter::And(branches),
                    "$or" => TaskFilter::Or(branches),
                    _ => TaskFilter::Nor(branches),
                })
            }
            _ if key.starts_with('$') => None,
            _ => {
                let field = store_field(key)?;
                match value {
                    Value::Object(ops) if is_operator_map(ops) => {
                        let mut clauses = ops
                            .iter()
                            .map(|(op, operand)| Self::compare(&field, op, operand))
                            .collect::<Option<Vec<_>>>()?;
                        Some(if clauses.len() == 1 {
                            clauses.remove(0)
                        } else {
                            TaskFilter::And(clauses)
                        })
                    }
                    _ => Self::compare(&field, "$eq", value),
                }
            }
        }
    }

    fn compare(field: &str, op: &str, operand: &Value) -> Option<Self> {
        if op == "$exists" {
            return Some(TaskFilter::Exists {
                field: field.to_string(),
                present: operand.as_bool()?,
            });
        }

        let op = CompareOp::from_operator(op)?;
        let value = match op {
            CompareOp::In | CompareOp::Nin => Value::Array(
                operand
                    .as_array()?
                    .iter()
                    .map(|item| normalize_operand(field, item))
                    .collect::<Option<Vec<_>>>()?,
            ),
            _ => normalize_operand(field, operand)?,
        };

        Some(TaskFilter::Compare {
            field: field.to_string(),
            op,
            value,
        })
    }

    /// Render this predicate as a SurrealQL condition.
    ///
    /// Operand values are appended to `params` and referenced as `$p<N>`.
    pub fn to_surql(&self, params: &mut Vec<(String, Value)>) -> String {
        match self {
            TaskFilter::All => "true".to_string(),
            TaskFilter::And(branches) => join_branches(branches, " AND ", "true", params),
            TaskFilter::Or(branches) => join_branches(branches, " OR ", "false", params),
            TaskFilter::Nor(branches) => {
                format!("!{}", join_branches(branches, " OR ", "false", params))
            }
            TaskFilter::Compare { field, op, value } => {
                compare_to_surql(field, *op, value, params)
            }
            TaskFilter::Exists { field, present } => {
                let op = if *present { "!=" } else { "=" };
                format!("{} {} NONE", field_expr(field), op)
            }
        }
    }
}

fn is_operator_map(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|key| key.starts_with('$'))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Map a client field name onto the stored field name
fn store_field(name: &str) -> Option<String> {
    match name {
        WIRE_ID | "id" => Some("id".to_string()),
        _ if is_identifier(name) => Some(name.to_string()),
        _ => None,
    }
}

fn is_datetime_field(field: &str) -> bool {
    DATETIME_FIELDS.contains(&field)
}

/// Validate an operand for `field`, normalizing dates to RFC 3339.
fn normalize_operand(field: &str, value: &Value) -> Option<Value> {
    if is_datetime_field(field) {
        let raw = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        return parse_deadline(&raw).map(|dt| Value::String(dt.to_rfc3339()));
    }

    if field == "id" && !value.is_string() {
        return None;
    }

    Some(value.clone())
}

fn join_branches(
    branches: &[TaskFilter],
    separator: &str,
    empty: &str,
    params: &mut Vec<(String, Value)>,
) -> String {
    if branches.is_empty() {
        return empty.to_string();
    }
    let parts: Vec<String> = branches.iter().map(|b| b.to_surql(params)).collect();
    format!("({})", parts.join(separator))
}

fn push_param(params: &mut Vec<(String, Value)>, value: Value) -> String {
    let name = format!("p{}", params.len());
    params.push((name.clone(), value));
    format!("${}", name)
}

fn field_expr(field: &str) -> String {
    if field == "id" {
        "record::id(id)".to_string()
    } else {
        format!("`{}`", field)
    }
}

fn compare_to_surql(
    field: &str,
    op: CompareOp,
    value: &Value,
    params: &mut Vec<(String, Value)>,
) -> String {
    let lhs = field_expr(field);

    match op {
        // Datetime set membership is expanded so each operand can be cast
        CompareOp::In | CompareOp::Nin if is_datetime_field(field) => {
            let items = value.as_array().cloned().unwrap_or_default();
            let (each, separator, empty) = if op == CompareOp::In {
                (CompareOp::Eq, " OR ", "false")
            } else {
                (CompareOp::Ne, " AND ", "true")
            };
            if items.is_empty() {
                return empty.to_string();
            }
            let parts: Vec<String> = items
                .into_iter()
                .map(|item| compare_to_surql(field, each, &item, params))
                .collect();
            format!("({})", parts.join(separator))
        }
        _ => {
            let param = push_param(params, value.clone());
            let rhs = if is_datetime_field(field) {
                format!("<datetime>{}", param)
            } else {
                param
            };
            format!("{} {} {}", lhs, op.infix(), rhs)
        }
    }
}

/// Sort direction for a [`SortKey`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => match n.as_f64()? {
                v if v == 1.0 => Some(SortDirection::Ascending),
                v if v == -1.0 => Some(SortDirection::Descending),
                _ => None,
            },
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "asc" | "ascending" => Some(SortDirection::Ascending),
                "desc" | "descending" => Some(SortDirection::Descending),
                _ => None,
            },
            _ => None,
        }
    }

    fn as_surql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// One entry of an ordering list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Parse a JSON-encoded `sort` parameter, keeping key order.
    ///
    /// Absent or malformed input yields an empty ordering.
    pub fn parse_list(raw: Option<&str>) -> Vec<SortKey> {
        let Some(raw) = raw else {
            return Vec::new();
        };

        let parsed = serde_json::from_str::<Value>(raw).ok().and_then(|value| {
            value
                .as_object()?
                .iter()
                .map(|(field, direction)| {
                    Some(SortKey::new(
                        store_field(field)?,
                        SortDirection::from_json(direction)?,
                    ))
                })
                .collect::<Option<Vec<_>>>()
        });

        parsed.unwrap_or_else(|| {
            debug!("Ignoring malformed sort: {}", raw);
            Vec::new()
        })
    }

    fn to_surql(&self) -> String {
        let field = if self.field == "id" {
            "id".to_string()
        } else {
            format!("`{}`", self.field)
        };
        format!("{} {}", field, self.direction.as_surql())
    }
}

/// Projection applied to returned tasks
///
/// Field names are wire names (`_id`, `assignedUser`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMask {
    /// Return only these fields, plus `_id` unless `with_id` is false
    Include { fields: Vec<String>, with_id: bool },
    /// Return every field except these
    Exclude(Vec<String>),
}

impl FieldMask {
    /// Parse a JSON-encoded `select` parameter.
    ///
    /// Absent, empty, or malformed input yields `None` (no projection).
    pub fn parse(raw: Option<&str>) -> Option<FieldMask> {
        let raw = raw?;
        let mask = serde_json::from_str::<Value>(raw)
            .ok()
            .and_then(|value| Self::from_json(&value));
        if mask.is_none() {
            debug!("Ignoring malformed or empty select: {}", raw);
        }
        mask
    }

    /// Build a mask from a decoded JSON document such as `{"name": 1}`.
    pub fn from_json(value: &Value) -> Option<FieldMask> {
        let map = value.as_object()?;
        let mut included = Vec::new();
        let mut excluded = Vec::new();
        let mut id_flag = None;

        for (key, flag) in map {
            if key.is_empty() || key.starts_with('$') {
                return None;
            }
            let keep = match flag {
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64()? != 0.0,
                _ => return None,
            };
            if key == WIRE_ID || key == "id" {
                id_flag = Some(keep);
            } else if keep {
                included.push(key.clone());
            } else {
                excluded.push(key.clone());
            }
        }

        match (included.is_empty(), excluded.is_empty(), id_flag) {
            (false, false, _) => None,
            (false, true, id_flag) => Some(FieldMask::Include {
                fields: included,
                with_id: id_flag != Some(false),
            }),
            (true, false, id_flag) => {
                if id_flag == Some(false) {
                    excluded.push(WIRE_ID.to_string());
                }
                Some(FieldMask::Exclude(excluded))
            }
            (true, true, Some(true)) => Some(FieldMask::Include {
                fields: Vec::new(),
                with_id: true,
            }),
            (true, true, Some(false)) => Some(FieldMask::Exclude(vec![WIRE_ID.to_string()])),
            (true, true, None) => None,
        }
    }

    /// Apply the mask to a serialized record. Non-objects pass through.
    pub fn apply(&self, value: Value) -> Value {
        let Value::Object(mut map) = value else {
            return value;
        };

        match self {
            FieldMask::Include { fields, with_id } => {
                map.retain(|key, _| {
                    if key == WIRE_ID {
                        *with_id
                    } else {
                        fields.iter().any(|f| f == key)
                    }
                });
            }
            FieldMask::Exclude(fields) => {
                map.retain(|key, _| !fields.iter().any(|f| f == key));
            }
        }

        Value::Object(map)
    }

    /// Serialize `item` and apply the mask.
    pub fn project<T: Serialize>(&self, item: &T) -> Result<Value, serde_json::Error> {
        serde_json::to_value(item).map(|value| self.apply(value))
    }
}

/// Serialize a task, projecting it when a mask is present
pub fn project_task(task: &Task, mask: Option<&FieldMask>) -> Result<Value, serde_json::Error> {
    match mask {
        Some(mask) => mask.project(task),
        None => serde_json::to_value(task),
    }
}

/// A complete read request against the task collection
#[derive(Debug, Clone, PartialEq)]
pub struct TaskQuery {
    pub filter: TaskFilter,
    pub sort: Vec<SortKey>,
    pub select: Option<FieldMask>,
    pub skip: u64,
    /// `None` means no cap
    pub limit: Option<u64>,
    /// Return only the number of matching tasks
    pub count: bool,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            filter: TaskFilter::All,
            sort: Vec::new(),
            select: None,
            skip: 0,
            limit: Some(DEFAULT_LIMIT),
            count: false,
        }
    }
}

impl TaskQuery {
    /// Create a query with default paging and no filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a query from raw request parameters.
    ///
    /// Every parameter is optional and falls back to its default when it
    /// cannot be understood. A `limit` of `0` removes the cap.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let get = |key: &str| params.get(key).map(String::as_str);

        let limit = match get("limit").map(|raw| raw.trim().parse::<u64>()) {
            Some(Ok(0)) => None,
            Some(Ok(n)) if n > MAX_PAGE_VALUE => None,
            Some(Ok(n)) => Some(n),
            _ => Some(DEFAULT_LIMIT),
        };

        Self {
            filter: TaskFilter::parse(get("where")),
            sort: SortKey::parse_list(get("sort")),
            select: FieldMask::parse(get("select")),
            skip: get("skip")
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .unwrap_or(0)
                .min(MAX_PAGE_VALUE),
            limit,
            count: get("count") == Some("true"),
        }
    }

    /// Set the filter
    pub fn with_filter(mut self, filter: TaskFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Append a sort key
    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(SortKey::new(field, direction));
        self
    }

    /// Set the projection
    pub fn with_select(mut self, mask: FieldMask) -> Self {
        self.select = Some(mask);
        self
    }

    /// Skip the first `n` matches
    pub fn skip(mut self, n: u64) -> Self {
        self.skip = n;
        self
    }

    /// Cap the number of results
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Remove the result cap
    pub fn no_limit(mut self) -> Self {
        self.limit = None;
        self
    }

    /// Return only the match count
    pub fn count_only(mut self) -> Self {
        self.count = true;
        self
    }

    /// Render the SELECT statement and its parameters
    fn select_statement(&self) -> (String, Vec<(String, Value)>) {
        let mut params = Vec::new();
        let mut sql = String::from("SELECT * FROM task");

        if self.filter != TaskFilter::All {
            sql.push_str(" WHERE ");
            sql.push_str(&self.filter.to_surql(&mut params));
        }

        if !self.sort.is_empty() {
            let keys: Vec<String> = self.sort.iter().map(SortKey::to_surql).collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit.min(MAX_PAGE_VALUE)));
        }

        if self.skip > 0 {
            sql.push_str(&format!(" START {}", self.skip.min(MAX_PAGE_VALUE)));
        }

        (sql, params)
    }

    /// Render the count statement; ordering and paging do not apply
    fn count_statement(&self) -> (String, Vec<(String, Value)>) {
        let mut params = Vec::new();
        let sql = if self.filter == TaskFilter::All {
            "SELECT count() FROM task GROUP ALL".to_string()
        } else {
            format!(
                "SELECT count() FROM task WHERE {} GROUP ALL",
                self.filter.to_surql(&mut params)
            )
        };
        (sql, params)
    }
}

/// Result of running a [`TaskQuery`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TaskListing {
    Count(u64),
    Tasks(Vec<Value>),
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: u64,
}

/// Executes task queries against the database
pub struct TaskLister<'a> {
    client: &'a Surreal<Db>,
}

impl<'a> TaskLister<'a> {
    /// Create a new TaskLister with the given database client
    pub fn new(client: &'a Surreal<Db>) -> Self {
        Self { client }
    }

    /// Run a query: the count when `count` is set, otherwise the projected tasks.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Query` if the database query fails.
    pub async fn run(&self, query: &TaskQuery) -> DbResult<TaskListing> {
        if query.count {
            return Ok(TaskListing::Count(self.count(query).await?));
        }

        let tasks = self.list(query).await?;
        let projected = tasks
            .iter()
            .map(|task| project_task(task, query.select.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TaskListing::Tasks(projected))
    }

    /// List tasks matching the filter, ordered and paged as requested.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Query` if the database query fails.
    pub async fn list(&self, query: &TaskQuery) -> DbResult<Vec<Task>> {
        let (sql, params) = query.select_statement();
        debug!("Listing tasks");
        trace!("Query: {} with {:?}", sql, params);

        let mut request = self.client.query(sql);
        for binding in params {
            request = request.bind(binding);
        }

        let mut result = request.await?;
        let rows: Vec<TaskRow> = result.take(0)?;

        Ok(rows.into_iter().map(TaskRow::into_task).collect())
    }

    /// Count tasks matching the filter, ignoring sort, select and paging.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Query` if the database query fails.
    pub async fn count(&self, query: &TaskQuery) -> DbResult<u64> {
        let (sql, params) = query.count_statement();
        trace!("Count query: {} with {:?}", sql, params);

        let mut request = self.client.query(sql);
        for binding in params {
            request = request.bind(binding);
        }

        let mut result = request.await?;
        let row: Option<CountRow> = result.take(0)?;

        Ok(row.map(|r| r.count).unwrap_or(0))
    }
}
