//! Data models for taskhub
//!
//! Defines the wire representations of tasks and users, the unvalidated
//! task input accepted by create/update, and the row types that map to the
//! SurrealDB schema.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::{Id, Thing};

use crate::error::{DbError, DbResult};

/// Display name stored on tasks that have no assignee
pub const UNASSIGNED: &str = "unassigned";

/// A task as returned to clients
///
/// `assigned_user` is a user record key or empty; `assigned_user_name`
/// mirrors that user's name or is [`UNASSIGNED`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Store-generated record key
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    pub completed: bool,
    pub assigned_user: String,
    pub assigned_user_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
}

impl Task {
    /// Whether the task currently references a user
    pub fn is_assigned(&self) -> bool {
        !self.assigned_user.is_empty()
    }
}

/// A user as seen by the task side of the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    /// Keys of tasks assigned to this user (set semantics, insertion order)
    pub pending_tasks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
}

/// Unvalidated task input for create and full-replace update
///
/// Empty strings are treated the same as absent values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Raw deadline, parsed by [`parse_deadline`]
    pub deadline: Option<String>,
    pub completed: bool,
    pub assigned_user: Option<String>,
}

impl TaskDraft {
    /// Create a draft with the two required fields
    pub fn new(name: impl Into<String>, deadline: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            deadline: Some(deadline.into()),
            ..Self::default()
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the completed flag
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Reference a user by record key
    pub fn assigned_to(mut self, user_id: impl Into<String>) -> Self {
        self.assigned_user = Some(user_id.into());
        self
    }

    /// Check required fields and normalize the draft.
    ///
    /// The returned fields are unassigned until the caller resolves
    /// [`TaskFields::assigned_user`] against the user store.
    ///
    /// # Errors
    ///
    /// Returns `DbError::ValidationError` if `name` or `deadline` is missing,
    /// or if the deadline cannot be parsed.
    pub fn validate(&self) -> DbResult<TaskFields> {
        let name = non_empty(self.name.as_deref()).map(str::trim);
        let deadline = non_empty(self.deadline.as_deref());

        let (name, deadline) = match (name, deadline) {
            (Some(name), Some(deadline)) if !name.is_empty() => (name, deadline),
            _ => return Err(DbError::validation("Name and deadline are required")),
        };

        let deadline =
            parse_deadline(deadline).ok_or_else(|| DbError::validation("Invalid deadline"))?;

        Ok(TaskFields {
            name: name.to_string(),
            description: self.description.clone().unwrap_or_default(),
            deadline,
            completed: self.completed,
            assigned_user: non_empty(self.assigned_user.as_deref())
                .unwrap_or_default()
                .to_string(),
            assigned_user_name: UNASSIGNED.to_string(),
        })
    }
}

/// Validated, persistable task fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFields {
    pub name: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    pub completed: bool,
    pub assigned_user: String,
    pub assigned_user_name: String,
}

impl TaskFields {
    /// Point the task at a resolved user
    pub fn assign(&mut self, user: &User) {
        self.assigned_user = user.id.clone();
        self.assigned_user_name = user.name.clone();
    }

    /// Clear the assignment
    pub fn unassign(&mut self) {
        self.assigned_user.clear();
        self.assigned_user_name = UNASSIGNED.to_string();
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Parse a deadline supplied by a client.
///
/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS[.fff]` (taken as
/// UTC), plain `YYYY-MM-DD` dates, and epoch milliseconds. Instants outside
/// years 0 through 9999 are rejected since they have no RFC 3339 form.
pub fn parse_deadline(raw: &str) -> Option<DateTime<Utc>> {
    parse_instant(raw.trim()).filter(|dt| (0..=9999).contains(&dt.year()))
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    if let Ok(millis) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }

    match raw.parse::<f64>() {
        Ok(millis) if millis.is_finite() => DateTime::from_timestamp_millis(millis as i64),
        _ => None,
    }
}

/// Extract the plain record key from a SurrealDB record id
pub(crate) fn record_key(thing: &Thing) -> String {
    match &thing.id {
        Id::String(key) => key.clone(),
        other => other.to_string(),
    }
}

fn unassigned_name() -> String {
    UNASSIGNED.to_string()
}

/// Internal row type for deserializing tasks from SurrealDB
#[derive(Debug, Deserialize)]
pub(crate) struct TaskRow {
    id: Thing,
    name: String,
    #[serde(default)]
    description: String,
    deadline: DateTime<Utc>,
    #[serde(default)]
    completed: bool,
    #[serde(rename = "assignedUser", default)]
    assigned_user: String,
    #[serde(rename = "assignedUserName", default = "unassigned_name")]
    assigned_user_name: String,
    #[serde(rename = "dateCreated", default)]
    date_created: Option<DateTime<Utc>>,
}

impl TaskRow {
    pub(crate) fn into_task(self) -> Task {
        Task {
            id: record_key(&self.id),
            name: self.name,
            description: self.description,
            deadline: self.deadline,
            completed: self.completed,
            assigned_user: self.assigned_user,
            assigned_user_name: self.assigned_user_name,
            date_created: self.date_created,
        }
    }
}

/// Internal row type for deserializing users from SurrealDB
#[derive(Debug, Deserialize)]
pub(crate) struct UserRow {
    id: Thing,
    name: String,
    #[serde(default)]
    email: String,
    #[serde(rename = "pendingTasks", default)]
    pending_tasks: Vec<String>,
    #[serde(rename = "dateCreated", default)]
    date_created: Option<DateTime<Utc>>,
}

impl UserRow {
    pub(crate) fn into_user(self) -> User {
        User {
            id: record_key(&self.id),
            name: self.name,
            email: self.email,
            pending_tasks: self.pending_tasks,
            date_created: self.date_created,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_task() -> Task {
        Task {
            id: "t1".to_string(),
            name: "Write report".to_string(),
            description: String::new(),
            deadline: Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap(),
            completed: false,
            assigned_user: String::new(),
            assigned_user_name: UNASSIGNED.to_string(),
            date_created: None,
        }
    }

    #[test]
    fn test_task_serializes_wire_field_names() {
        let value = serde_json::to_value(sample_task()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj["_id"], "t1");
        assert_eq!(obj["assignedUser"], "");
        assert_eq!(obj["assignedUserName"], "unassigned");
        assert_eq!(obj["deadline"], "2030-01-02T03:04:05Z");
        assert!(!obj.contains_key("dateCreated"));
        assert!(!obj.contains_key("id"));
    }

    #[test]
    fn test_task_is_assigned() {
        let mut task = sample_task();
        assert!(!task.is_assigned());
        task.assigned_user = "u1".to_string();
        assert!(task.is_assigned());
    }

    #[test]
    fn test_user_serializes_pending_tasks() {
        let user = User {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            pending_tasks: vec!["t1".to_string()],
            date_created: None,
        };
        let value = serde_json::to_value(user).unwrap();
        assert_eq!(value["pendingTasks"], serde_json::json!(["t1"]));
        assert_eq!(value["_id"], "u1");
    }

    #[test]
    fn test_validate_requires_name_and_deadline() {
        let missing_deadline = TaskDraft {
            name: Some("Task".to_string()),
            ..TaskDraft::default()
        };
        let err = missing_deadline.validate().unwrap_err();
        assert_eq!(err.to_string(), "Name and deadline are required");

        let missing_name = TaskDraft {
            deadline: Some("2030-01-01".to_string()),
            ..TaskDraft::default()
        };
        assert!(matches!(
            missing_name.validate(),
            Err(DbError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        let draft = TaskDraft::new("   ", "2030-01-01");
        assert!(draft.validate().is_err());

        let draft = TaskDraft::new("", "2030-01-01");
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unparseable_deadline() {
        let err = TaskDraft::new("Task", "next tuesday")
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid deadline");
    }

    #[test]
    fn test_validate_trims_name_and_fills_defaults() {
        let fields = TaskDraft::new("  Ship it  ", "2030-06-01T12:00:00Z")
            .validate()
            .unwrap();
        assert_eq!(fields.name, "Ship it");
        assert_eq!(fields.description, "");
        assert!(!fields.completed);
        assert_eq!(fields.assigned_user, "");
        assert_eq!(fields.assigned_user_name, UNASSIGNED);
        assert_eq!(
            fields.deadline,
            Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_validate_keeps_assigned_user_reference() {
        let fields = TaskDraft::new("Task", "2030-01-01")
            .assigned_to("u42")
            .validate()
            .unwrap();
        assert_eq!(fields.assigned_user, "u42");

        let fields = TaskDraft::new("Task", "2030-01-01")
            .assigned_to("")
            .validate()
            .unwrap();
        assert_eq!(fields.assigned_user, "");
    }

    #[test]
    fn test_task_fields_assign_and_unassign() {
        let mut fields = TaskDraft::new("Task", "2030-01-01").validate().unwrap();
        let user = User {
            id: "u1".to_string(),
            name: "Grace".to_string(),
            email: String::new(),
            pending_tasks: vec![],
            date_created: None,
        };

        fields.assign(&user);
        assert_eq!(fields.assigned_user, "u1");
        assert_eq!(fields.assigned_user_name, "Grace");

        fields.unassign();
        assert_eq!(fields.assigned_user, "");
        assert_eq!(fields.assigned_user_name, UNASSIGNED);
    }

    #[test]
    fn test_parse_deadline_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_deadline("2024-03-01"), Some(expected));
        assert_eq!(parse_deadline("2024-03-01T00:00:00"), Some(expected));
        assert_eq!(parse_deadline("2024-03-01T00:00:00.000Z"), Some(expected));
        assert_eq!(parse_deadline("2024-03-01T01:00:00+01:00"), Some(expected));
        assert_eq!(
            parse_deadline(&expected.timestamp_millis().to_string()),
            Some(expected)
        );
    }

    #[test]
    fn test_parse_deadline_rejects_garbage() {
        assert_eq!(parse_deadline(""), None);
        assert_eq!(parse_deadline("   "), None);
        assert_eq!(parse_deadline("tomorrow"), None);
        assert_eq!(parse_deadline("2024-13-45"), None);
        assert_eq!(parse_deadline("NaN"), None);
    }

    #[test]
    fn test_parse_deadline_rejects_years_beyond_four_digits() {
        let last = parse_deadline("253402300799999").unwrap();
        assert_eq!(last.to_rfc3339(), "9999-12-31T23:59:59.999+00:00");
        assert_eq!(parse_deadline("253402300800000"), None);
        assert_eq!(parse_deadline("-62167219200001"), None);
        assert_eq!(parse_deadline("8.64e15"), None);
    }

    #[test]
    fn test_validate_rejects_out_of_range_deadline() {
        let err = TaskDraft::new("Task", "253402300800000").validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid deadline");
    }
}
