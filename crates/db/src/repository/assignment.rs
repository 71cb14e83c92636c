//! Task writes that keep user pending lists consistent
//!
//! Every task write here is paired with the matching edit to the assignee's
//! `pendingTasks`. The store has no multi-record transactions across these
//! calls, so a failure between the two writes leaves them out of step; that
//! case surfaces as [`DbError::BackReference`].

use crate::error::{DbError, DbResult};
use crate::models::{Task, TaskDraft};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use tracing::{debug, info, warn};

use super::{TaskRepository, UserRepository};

/// Coordinates task writes with the assignee's pending list
pub struct AssignmentService<'a> {
    tasks: TaskRepository<'a>,
    users: UserRepository<'a>,
}

impl<'a> AssignmentService<'a> {
    /// Create a new AssignmentService with the given database client
    pub fn new(client: &'a Surreal<Db>) -> Self {
        Self {
            tasks: TaskRepository::new(client),
            users: UserRepository::new(client),
        }
    }

    /// Create a task.
    ///
    /// A referenced user that exists becomes the assignee and the task key is
    /// added to its pending list. A referenced user that does not exist is
    /// dropped and the task is stored unassigned.
    ///
    /// # Errors
    ///
    /// Returns `DbError::ValidationError` for a missing name or deadline.
    /// Returns `DbError::BackReference` if the task was stored but the
    /// pending list could not be updated.
    pub async fn create_task(&self, draft: &TaskDraft) -> DbResult<Task> {
        let mut fields = draft.validate()?;

        if !fields.assigned_user.is_empty() {
            match self.users.get(&fields.assigned_user).await? {
                Some(user) => fields.assign(&user),
                None => {
                    debug!(
                        "Assigned user {} not found, creating task unassigned",
                        fields.assigned_user
                    );
                    fields.unassign();
                }
            }
        }

        let task = self.tasks.create(&fields).await?;

        if task.is_assigned() {
            self.link(&task.id, &task.assigned_user).await?;
        }

        info!("Created task {}", task.id);
        Ok(task)
    }

    /// Replace a task's fields.
    ///
    /// The pending lists are only touched when the assignee changes: the old
    /// assignee loses the key and the new one gains it.
    ///
    /// # Errors
    ///
    /// Returns `DbError::ValidationError` for a missing name or deadline, or
    /// when the referenced user does not exist ("assignedUser not found").
    /// Returns `DbError::NotFound` if the task does not exist.
    /// Returns `DbError::BackReference` if the task was stored but a pending
    /// list could not be updated.
    pub async fn update_task(&self, id: &str, draft: &TaskDraft) -> DbResult<Task> {
        let mut fields = draft.validate()?;

        let current = self
            .tasks
            .get(id)
            .await?
            .ok_or_else(|| DbError::task_not_found(id))?;

        if fields.assigned_user.is_empty() {
            fields.unassign();
        } else {
            let user = self
                .users
                .get(&fields.assigned_user)
                .await?
                .ok_or_else(|| DbError::validation("assignedUser not found"))?;
            fields.assign(&user);
        }

        let updated = self
            .tasks
            .replace(id, &fields)
            .await?
            .ok_or_else(|| DbError::task_not_found(id))?;

        if current.assigned_user != updated.assigned_user {
            if current.is_assigned() {
                self.unlink(&updated.id, &current.assigned_user).await?;
            }
            if updated.is_assigned() {
                self.link(&updated.id, &updated.assigned_user).await?;
            }
        }

        info!("Updated task {}", updated.id);
        Ok(updated)
    }

    /// Delete a task, first removing it from its assignee's pending list.
    ///
    /// # Returns
    ///
    /// The task as it was before deletion.
    ///
    /// # Errors
    ///
    /// Returns `DbError::NotFound` if the task does not exist.
    pub async fn delete_task(&self, id: &str) -> DbResult<Task> {
        let task = self
            .tasks
            .get(id)
            .await?
            .ok_or_else(|| DbError::task_not_found(id))?;

        if task.is_assigned() {
            self.users
                .remove_pending_task(&task.assigned_user, &task.id)
                .await?;
        }

        self.tasks.delete(&task.id).await?;

        info!("Deleted task {}", task.id);
        Ok(task)
    }

    async fn link(&self, task_id: &str, user_id: &str) -> DbResult<()> {
        self.users
            .add_pending_task(user_id, task_id)
            .await
            .map_err(|e| back_reference(task_id, user_id, e))
    }

    async fn unlink(&self, task_id: &str, user_id: &str) -> DbResult<()> {
        self.users
            .remove_pending_task(user_id, task_id)
            .await
            .map_err(|e| back_reference(task_id, user_id, e))
    }
}

fn back_reference(task_id: &str, user_id: &str, source: DbError) -> DbError {
    warn!(
        "Task {} saved but pending tasks of user {} not updated: {}",
        task_id,
        user_id,
        source.full_message()
    );
    DbError::BackReference {
        task_id: task_id.to_string(),
        user_id: user_id.to_string(),
        source: Box::new(source),
    }
}
