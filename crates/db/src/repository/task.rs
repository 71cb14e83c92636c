//! Task repository for single-record task operations
//!
//! Encapsulates the SurrealDB statements that read and write one task.
//! Keeping user pending lists in step with these writes is the job of
//! [`AssignmentService`](super::AssignmentService).

use crate::error::{DbError, DbResult};
use crate::models::{Task, TaskFields, TaskRow};
use serde::Deserialize;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use tracing::{debug, trace};

mod sql {
    pub const CREATE_TASK: &str = r#"CREATE task SET
        name = $name,
        description = $description,
        deadline = <datetime>$deadline,
        completed = $completed,
        assignedUser = $assigned_user,
        assignedUserName = $assigned_user_name"#;

    /// `UPDATE` on a single record id never creates it
    pub const REPLACE_TASK: &str = r#"UPDATE type::thing("task", $id) SET
        name = $name,
        description = $description,
        deadline = <datetime>$deadline,
        completed = $completed,
        assignedUser = $assigned_user,
        assignedUserName = $assigned_user_name"#;
}

/// Minimal struct for existence checks
#[derive(Debug, Deserialize)]
struct IdOnly {
    #[allow(dead_code)]
    id: surrealdb::sql::Thing,
}

/// Repository for task CRUD operations
pub struct TaskRepository<'a> {
    client: &'a Surreal<Db>,
}

impl<'a> TaskRepository<'a> {
    /// Create a new TaskRepository with the given database client
    pub fn new(client: &'a Surreal<Db>) -> Self {
        Self { client }
    }

    /// Check if a task with the given key exists.
    pub async fn exists(&self, id: &str) -> DbResult<bool> {
        let task: Option<IdOnly> = self
            .client
            .select(("task", id))
            .await
            .map_err(|e| DbError::Query(Box::new(e)))?;
        Ok(task.is_some())
    }

    /// Insert a new task; the store generates its key and `dateCreated`.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Query` if the database operation fails.
    pub async fn create(&self, fields: &TaskFields) -> DbResult<Task> {
        debug!("Creating task: {}", fields.name);
        trace!("Task fields: {:?}", fields);

        let mut result = self
            .client
            .query(sql::CREATE_TASK)
            .bind(("name", fields.name.clone()))
            .bind(("description", fields.description.clone()))
            .bind(("deadline", fields.deadline.to_rfc3339()))
            .bind(("completed", fields.completed))
            .bind(("assigned_user", fields.assigned_user.clone()))
            .bind(("assigned_user_name", fields.assigned_user_name.clone()))
            .await?;

        let row: Option<TaskRow> = result.take(0)?;
        let task = row.map(TaskRow::into_task).ok_or_else(|| DbError::NotFound {
            entity: "Task",
            id: "<new>".to_string(),
        })?;

        debug!("Created task: {}", task.id);
        Ok(task)
    }

    /// Get a task by key.
    ///
    /// # Returns
    ///
    /// `Some(Task)` if found, `None` otherwise.
    pub async fn get(&self, id: &str) -> DbResult<Option<Task>> {
        debug!("Fetching task: {}", id);
        let row: Option<TaskRow> = self.client.select(("task", id)).await.map_err(|e| {
            debug!("Failed to fetch task: {}: {}", id, e);
            DbError::Query(Box::new(e))
        })?;
        if row.is_none() {
            debug!("Task not found: {}", id);
        }
        Ok(row.map(TaskRow::into_task))
    }

    /// Overwrite every client-controlled field of an existing task.
    ///
    /// `dateCreated` is left untouched.
    ///
    /// # Returns
    ///
    /// The stored task, or `None` if no task has this key.
    pub async fn replace(&self, id: &str, fields: &TaskFields) -> DbResult<Option<Task>> {
        debug!("Replacing task: {}", id);
        trace!("Task fields: {:?}", fields);

        let mut result = self
            .client
            .query(sql::REPLACE_TASK)
            .bind(("id", id.to_string()))
            .bind(("name", fields.name.clone()))
            .bind(("description", fields.description.clone()))
            .bind(("deadline", fields.deadline.to_rfc3339()))
            .bind(("completed", fields.completed))
            .bind(("assigned_user", fields.assigned_user.clone()))
            .bind(("assigned_user_name", fields.assigned_user_name.clone()))
            .await?;

        let row: Option<TaskRow> = result.take(0)?;
        Ok(row.map(TaskRow::into_task))
    }

    /// Delete a task by key.
    ///
    /// # Returns
    ///
    /// `true` if a task was removed, `false` if none existed.
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        debug!("Deleting task: {}", id);
        let deleted: Option<TaskRow> = self.client.delete(("task", id)).await.map_err(|e| {
            debug!("Failed to delete task: {}: {}", id, e);
            DbError::Query(Box::new(e))
        })?;
        Ok(deleted.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskDraft, UNASSIGNED};
    use crate::test_utils::create_test_db;

    fn fields(name: &str) -> TaskFields {
        TaskDraft::new(name, "2030-01-01T09:30:00Z")
            .with_description("details")
            .validate()
            .unwrap()
    }

    #[tokio::test]
    async fn test_exists_returns_false_for_nonexistent() {
        let db = create_test_db().await;
        let repo = TaskRepository::new(db.client());

        assert!(!repo.exists("nonexistent").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_and_exists() {
        let db = create_test_db().await;
        let repo = TaskRepository::new(db.client());

        let task = repo.create(&fields("Test Task")).await.unwrap();

        assert!(!task.id.is_empty());
        assert!(repo.exists(&task.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_returns_stored_fields() {
        let db = create_test_db().await;
        let repo = TaskRepository::new(db.client());

        let task = repo.create(&fields("Full Task")).await.unwrap();

        assert_eq!(task.name, "Full Task");
        assert_eq!(task.description, "details");
        assert_eq!(task.deadline.to_rfc3339(), "2030-01-01T09:30:00+00:00");
        assert!(!task.completed);
        assert_eq!(task.assigned_user, "");
        assert_eq!(task.assigned_user_name, UNASSIGNED);
        assert!(task.date_created.is_some());
    }

    #[tokio::test]
    async fn test_create_generates_distinct_keys() {
        let db = create_test_db().await;
        let repo = TaskRepository::new(db.client());

        let a = repo.create(&fields("A")).await.unwrap();
        let b = repo.create(&fields("B")).await.unwrap();

        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_get_existing_task() {
        let db = create_test_db().await;
        let repo = TaskRepository::new(db.client());

        let created = repo.create(&fields("Get Test")).await.unwrap();
        let retrieved = repo.get(&created.id).await.unwrap();

        assert_eq!(retrieved, Some(created));
    }

    #[tokio::test]
    async fn test_get_nonexistent_task() {
        let db = create_test_db().await;
        let repo = TaskRepository::new(db.client());

        assert!(repo.get("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_overwrites_fields_and_keeps_date_created() {
        let db = create_test_db().await;
        let repo = TaskRepository::new(db.client());
        let created = repo.create(&fields("Before")).await.unwrap();

        let next = TaskDraft::new("After", "2031-05-05")
            .with_completed(true)
            .validate()
            .unwrap();
        let replaced = repo.replace(&created.id, &next).await.unwrap().unwrap();

        assert_eq!(replaced.id, created.id);
        assert_eq!(replaced.name, "After");
        assert_eq!(replaced.description, "");
        assert!(replaced.completed);
        assert_eq!(replaced.date_created, created.date_created);
    }

    #[tokio::test]
    async fn test_replace_nonexistent_returns_none_and_creates_nothing() {
        let db = create_test_db().await;
        let repo = TaskRepository::new(db.client());

        let result = repo.replace("ghost", &fields("Ghost")).await.unwrap();

        assert!(result.is_none());
        assert!(!repo.exists("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let db = create_test_db().await;
        let repo = TaskRepository::new(db.client());
        let task = repo.create(&fields("Delete Me")).await.unwrap();

        assert!(repo.delete(&task.id).await.unwrap());
        assert!(!repo.exists(&task.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_nonexistent() {
        let db = create_test_db().await;
        let repo = TaskRepository::new(db.client());

        assert!(!repo.delete("nonexistent").await.unwrap());
    }
}
