//! Database schema initialization for taskhub
//!
//! Defines the SurrealDB tables for tasks and users.

use crate::error::DbError;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

/// SQL statements for schema initialization
mod sql {
    /// Define the task table with all fields
    pub const DEFINE_TASK_TABLE: &str = r#"
        DEFINE TABLE IF NOT EXISTS task SCHEMAFULL;

        DEFINE FIELD IF NOT EXISTS name ON task TYPE string
            ASSERT string::len($value) > 0;

        DEFINE FIELD IF NOT EXISTS description ON task TYPE string DEFAULT "";

        DEFINE FIELD IF NOT EXISTS deadline ON task TYPE datetime;

        DEFINE FIELD IF NOT EXISTS completed ON task TYPE bool DEFAULT false;

        DEFINE FIELD IF NOT EXISTS assignedUser ON task TYPE string DEFAULT "";

        DEFINE FIELD IF NOT EXISTS assignedUserName ON task TYPE string DEFAULT "unassigned";

        DEFINE FIELD IF NOT EXISTS dateCreated ON task TYPE datetime DEFAULT time::now();
    "#;

    /// Define the user table; `pendingTasks` holds task record keys
    pub const DEFINE_USER_TABLE: &str = r#"
        DEFINE TABLE IF NOT EXISTS user SCHEMAFULL;

        DEFINE FIELD IF NOT EXISTS name ON user TYPE string;

        DEFINE FIELD IF NOT EXISTS email ON user TYPE string DEFAULT "";

        DEFINE FIELD IF NOT EXISTS pendingTasks ON user TYPE array<string> DEFAULT [];

        DEFINE FIELD IF NOT EXISTS dateCreated ON user TYPE datetime DEFAULT time::now();
    "#;
}

/// Initialize the database schema.
///
/// Creates the task and user tables with their fields and defaults.
/// Idempotent: every definition uses `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns `DbError::Schema` if any schema definition fails.
pub async fn init_schema(client: &Surreal<Db>) -> Result<(), DbError> {
    client
        .query(sql::DEFINE_TASK_TABLE)
        .await
        .and_then(|response| response.check())
        .map_err(|e| DbError::Schema(Box::new(e)))?;

    client
        .query(sql::DEFINE_USER_TABLE)
        .await
        .and_then(|response| response.check())
        .map_err(|e| DbError::Schema(Box::new(e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use surrealdb::engine::local::Mem;

    /// Helper to create a test database without schema
    async fn setup_test_db() -> Surreal<Db> {
        let client = Surreal::new::<Mem>(()).await.unwrap();
        client.use_ns("taskhub").use_db("test").await.unwrap();
        client
    }

    #[tokio::test]
    async fn test_init_schema_succeeds() {
        let client = setup_test_db().await;

        let result = init_schema(&client).await;
        assert!(result.is_ok(), "Schema init failed: {:?}", result.err());
    }

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let client = setup_test_db().await;

        let first = init_schema(&client).await;
        assert!(first.is_ok(), "First init failed: {:?}", first.err());

        let second = init_schema(&client).await;
        assert!(second.is_ok(), "Second init failed: {:?}", second.err());
    }

    #[tokio::test]
    async fn test_task_table_applies_defaults() {
        let client = setup_test_db().await;
        init_schema(&client).await.unwrap();

        #[derive(Debug, serde::Deserialize)]
        struct Row {
            description: String,
            completed: bool,
            #[serde(rename = "assignedUser")]
            assigned_user: String,
            #[serde(rename = "assignedUserName")]
            assigned_user_name: String,
        }

        let mut response = client
            .query(
                r#"CREATE task:minimal SET
                    name = "Minimal",
                    deadline = <datetime>"2030-01-01T00:00:00Z""#,
            )
            .await
            .unwrap();
        let row: Option<Row> = response.take(0).unwrap();
        let row = row.unwrap();

        assert_eq!(row.description, "");
        assert!(!row.completed);
        assert_eq!(row.assigned_user, "");
        assert_eq!(row.assigned_user_name, "unassigned");
    }

    #[tokio::test]
    async fn test_task_table_rejects_missing_deadline() {
        let client = setup_test_db().await;
        init_schema(&client).await.unwrap();

        let mut response = client
            .query(r#"CREATE task SET name = "No deadline""#)
            .await
            .unwrap();

        // SurrealDB returns statement errors in the response, not as a query error
        let check: Result<Option<surrealdb::Value>, _> = response.take(0);
        assert!(check.is_err(), "Should reject a task without a deadline");
    }

    #[tokio::test]
    async fn test_task_table_rejects_empty_name() {
        let client = setup_test_db().await;
        init_schema(&client).await.unwrap();

        let mut response = client
            .query(r#"CREATE task SET name = "", deadline = time::now()"#)
            .await
            .unwrap();

        let check: Result<Option<surrealdb::Value>, _> = response.take(0);
        assert!(check.is_err(), "Should reject an empty name");
    }

    #[tokio::test]
    async fn test_user_table_defaults_pending_tasks() {
        let client = setup_test_db().await;
        init_schema(&client).await.unwrap();

        #[derive(Debug, serde::Deserialize)]
        struct Row {
            #[serde(rename = "pendingTasks")]
            pending_tasks: Vec<String>,
        }

        let mut response = client
            .query(r#"CREATE user:ada SET name = "Ada""#)
            .await
            .unwrap();
        let row: Option<Row> = response.take(0).unwrap();

        assert!(row.unwrap().pending_tasks.is_empty());
    }
}
