//! `PostgreSQL` repository implementation for task queue storage.

use super::{
    models::{TaskLifecycleChangeset, TaskRow},
    schema::tasks,
};
use crate::deal::domain::{DealId, LeadId, OrganizationId};
use crate::task::{
    domain::{
        AgentRole, PersistedTaskData, Task, TaskId, TaskKind, TaskLogEntry, TaskStatus,
    },
    ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by task adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed task repository.
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: TaskPgPool,
}

impl PostgresTaskRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskRepositoryError::persistence)?
    }

    async fn load_where<F>(&self, filter: F) -> TaskRepositoryResult<Vec<Task>>
    where
        F: FnOnce(&mut PgConnection) -> QueryResult<Vec<TaskRow>> + Send + 'static,
    {
        self.run_blocking(move |connection| {
            let rows = filter(connection).map_err(TaskRepositoryError::persistence)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let task_id = task.id();
        let new_row = to_row(task)?;

        self.run_blocking(move |connection| {
            diesel::insert_into(tasks::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        TaskRepositoryError::DuplicateTask(task_id)
                    }
                    _ => TaskRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update_lifecycle(&self, task: &Task) -> TaskRepositoryResult<()> {
        let task_id = task.id();
        let changes = to_lifecycle_changeset(task)?;

        self.run_blocking(move |connection| {
            let updated = diesel::update(tasks::table.filter(tasks::id.eq(task_id.into_inner())))
                .set(&changes)
                .execute(connection)
                .map_err(TaskRepositoryError::persistence)?;
            if updated == 0 {
                return Err(TaskRepositoryError::NotFound(task_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .filter(tasks::id.eq(id.into_inner()))
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(TaskRepositoryError::persistence)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn list_pending(
        &self,
        organization_id: OrganizationId,
        target_role: AgentRole,
    ) -> TaskRepositoryResult<Vec<Task>> {
        self.load_where(move |connection| {
            tasks::table
                .filter(tasks::organization_id.eq(organization_id.into_inner()))
                .filter(tasks::target_role.eq(target_role.as_str()))
                .filter(tasks::status.eq(TaskStatus::Pending.as_str()))
                .order((tasks::priority.desc(), tasks::created_at.asc()))
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)
        })
        .await
    }

    async fn list_by_status(&self, status: TaskStatus) -> TaskRepositoryResult<Vec<Task>> {
        self.load_where(move |connection| {
            tasks::table
                .filter(tasks::status.eq(status.as_str()))
                .order(tasks::created_at.asc())
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)
        })
        .await
    }

    async fn find_by_deal(&self, deal_id: DealId) -> TaskRepositoryResult<Vec<Task>> {
        self.load_where(move |connection| {
            tasks::table
                .filter(tasks::deal_id.eq(deal_id.into_inner()))
                .order(tasks::created_at.asc())
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)
        })
        .await
    }
}

pub(crate) fn to_row(task: &Task) -> TaskRepositoryResult<TaskRow> {
    let changes = to_lifecycle_changeset(task)?;
    Ok(TaskRow {
        id: task.id().into_inner(),
        organization_id: task.organization_id().into_inner(),
        source_role: task.source_role().as_str().to_owned(),
        target_role: task.target_role().as_str().to_owned(),
        kind: task.kind().as_str().to_owned(),
        title: task.title().to_owned(),
        description: task.description().map(str::to_owned),
        input: task.input().clone(),
        output: changes.output,
        error: changes.error,
        status: changes.status,
        priority: task.priority(),
        deal_id: task.deal_id().map(DealId::into_inner),
        lead_id: task.lead_id().map(LeadId::into_inner),
        logs: changes.logs,
        attempt: i32::try_from(task.attempt()).map_err(TaskRepositoryError::persistence)?,
        created_at: task.created_at(),
        started_at: changes.started_at,
        completed_at: changes.completed_at,
        updated_at: changes.updated_at,
    })
}

fn to_lifecycle_changeset(task: &Task) -> TaskRepositoryResult<TaskLifecycleChangeset> {
    let logs = serde_json::to_value(task.logs()).map_err(TaskRepositoryError::persistence)?;
    Ok(TaskLifecycleChangeset {
        status: task.status().as_str().to_owned(),
        output: task.output().cloned(),
        error: task.error().map(str::to_owned),
        logs,
        started_at: task.started_at(),
        completed_at: task.completed_at(),
        updated_at: task.updated_at(),
    })
}

pub(crate) fn row_to_task(row: TaskRow) -> TaskRepositoryResult<Task> {
    let source_role =
        AgentRole::try_from(row.source_role.as_str()).map_err(TaskRepositoryError::persistence)?;
    let target_role =
        AgentRole::try_from(row.target_role.as_str()).map_err(TaskRepositoryError::persistence)?;
    let kind = TaskKind::try_from(row.kind.as_str()).map_err(TaskRepositoryError::persistence)?;
    let status =
        TaskStatus::try_from(row.status.as_str()).map_err(TaskRepositoryError::persistence)?;
    let logs = serde_json::from_value::<Vec<TaskLogEntry>>(row.logs)
        .map_err(TaskRepositoryError::persistence)?;
    let attempt = u32::try_from(row.attempt).map_err(TaskRepositoryError::persistence)?;

    Ok(Task::from_persisted(PersistedTaskData {
        id: TaskId::from_uuid(row.id),
        organization_id: OrganizationId::from_uuid(row.organization_id),
        source_role,
        target_role,
        kind,
        title: row.title,
        description: row.description,
        input: row.input,
        output: row.output,
        error: row.error,
        status,
        priority: row.priority,
        deal_id: row.deal_id.map(DealId::from_uuid),
        lead_id: row.lead_id.map(LeadId::from_uuid),
        logs,
        attempt,
        created_at: row.created_at,
        started_at: row.started_at,
        completed_at: row.completed_at,
        updated_at: row.updated_at,
    }))
}
