//! User repository
//!
//! Only the operations the task side needs: create and read a user, and
//! edit its `pendingTasks` list.

use crate::error::{DbError, DbResult};
use crate::models::{User, UserRow};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use tracing::debug;

mod sql {
    pub const CREATE_USER: &str = "CREATE user SET name = $name, email = $email";

    /// `array::add` keeps set semantics
    pub const ADD_PENDING: &str = r#"UPDATE type::thing("user", $user)
        SET pendingTasks = array::add(pendingTasks, $task)"#;

    pub const REMOVE_PENDING: &str = r#"UPDATE type::thing("user", $user)
        SET pendingTasks -= $task"#;
}

/// Repository for users and their pending task lists
pub struct UserRepository<'a> {
    client: &'a Surreal<Db>,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database client
    pub fn new(client: &'a Surreal<Db>) -> Self {
        Self { client }
    }

    /// Insert a user with an empty pending list.
    pub async fn create(&self, name: &str, email: &str) -> DbResult<User> {
        debug!("Creating user: {}", name);

        let mut result = self
            .client
            .query(sql::CREATE_USER)
            .bind(("name", name.to_string()))
            .bind(("email", email.to_string()))
            .await?;

        let row: Option<UserRow> = result.take(0)?;
        row.map(UserRow::into_user).ok_or_else(|| DbError::NotFound {
            entity: "User",
            id: "<new>".to_string(),
        })
    }

    /// Get a user by key.
    pub async fn get(&self, id: &str) -> DbResult<Option<User>> {
        debug!("Fetching user: {}", id);
        let row: Option<UserRow> = self
            .client
            .select(("user", id))
            .await
            .map_err(|e| DbError::Query(Box::new(e)))?;
        Ok(row.map(UserRow::into_user))
    }

    /// Add a task key to the user's pending list unless already present.
    ///
    /// A missing user is not an error; nothing is written.
    pub async fn add_pending_task(&self, user_id: &str, task_id: &str) -> DbResult<()> {
        debug!("Adding task {} to pending tasks of user {}", task_id, user_id);
        self.client
            .query(sql::ADD_PENDING)
            .bind(("user", user_id.to_string()))
            .bind(("task", task_id.to_string()))
            .await?
            .check()?;
        Ok(())
    }

    /// Remove every occurrence of a task key from the user's pending list.
    ///
    /// A missing user is not an error; nothing is written.
    pub async fn remove_pending_task(&self, user_id: &str, task_id: &str) -> DbResult<()> {
        debug!(
            "Removing task {} from pending tasks of user {}",
            task_id, user_id
        );
        self.client
            .query(sql::REMOVE_PENDING)
            .bind(("user", user_id.to_string()))
            .bind(("task", task_id.to_string()))
            .await?
            .check()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_db, pending_tasks_of};

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = create_test_db().await;
        let repo = UserRepository::new(db.client());

        let user = repo.create("Ada", "ada@example.com").await.unwrap();
        let fetched = repo.get(&user.id).await.unwrap().unwrap();

        assert_eq!(fetched.name, "Ada");
        assert_eq!(fetched.email, "ada@example.com");
        assert!(fetched.pending_tasks.is_empty());
        assert!(fetched.date_created.is_some());
    }

    #[tokio::test]
    async fn test_get_nonexistent_user() {
        let db = create_test_db().await;
        let repo = UserRepository::new(db.client());

        assert!(repo.get("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_pending_task_is_idempotent() {
        let db = create_test_db().await;
        let repo = UserRepository::new(db.client());
        let user = repo.create("Ada", "").await.unwrap();

        repo.add_pending_task(&user.id, "t1").await.unwrap();
        repo.add_pending_task(&user.id, "t2").await.unwrap();
        repo.add_pending_task(&user.id, "t1").await.unwrap();

        assert_eq!(pending_tasks_of(&db, &user.id).await, vec!["t1", "t2"]);
    }

    #[tokio::test]
    async fn test_remove_pending_task() {
        let db = create_test_db().await;
        let repo = UserRepository::new(db.client());
        let user = repo.create("Ada", "").await.unwrap();
        repo.add_pending_task(&user.id, "t1").await.unwrap();
        repo.add_pending_task(&user.id, "t2").await.unwrap();

        repo.remove_pending_task(&user.id, "t1").await.unwrap();
        repo.remove_pending_task(&user.id, "absent").await.unwrap();

        assert_eq!(pending_tasks_of(&db, &user.id).await, vec!["t2"]);
    }

    #[tokio::test]
    async fn test_pending_edits_on_missing_user_are_noops() {
        let db = create_test_db().await;
        let repo = UserRepository::new(db.client());

        repo.add_pending_task("ghost", "t1").await.unwrap();
        repo.remove_pending_task("ghost", "t1").await.unwrap();

        assert!(repo.get("ghost").await.unwrap().is_none());
    }
}
