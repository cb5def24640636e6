//! `PostgreSQL` integration tests for task storage and the pending queue.

use super::helpers::{BoxError, TestDatabase, clock, test_runtime};
use chrono::Duration;
use mercator::deal::domain::OrganizationId;
use mercator::task::{
    domain::{AgentRole, Task, TaskKind, TaskLogEntry, TaskLogKind, TaskSpec, TaskStatus},
    ports::{TaskRepository, TaskRepositoryError},
};
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use rstest::rstest;
use serde_json::json;

fn spec(organization_id: OrganizationId, target_role: AgentRole, title: &str) -> TaskSpec {
    TaskSpec::new(
        organization_id,
        AgentRole::Orchestrator,
        target_role,
        TaskKind::SendOutreach,
        title,
    )
}

#[rstest]
fn lifecycle_update_persists_output_logs_and_timestamps(
    shared_test_cluster: &'static TestCluster,
) -> Result<(), BoxError> {
    let db = TestDatabase::from_template(shared_test_cluster, "task_lifecycle")?;
    let stores = db.stores()?;
    let rt = test_runtime()?;
    let clock = clock();

    let mut task = Task::new(
        spec(OrganizationId::new(), AgentRole::Outreach, "Send outreach")
            .with_description("First contact")
            .with_input(json!({"template": "outreach"}))
            .with_priority(3),
        &clock,
    )?;
    rt.block_on(stores.tasks.store(&task))?;

    clock.advance(Duration::minutes(1));
    task.start_processing(&clock)?;
    rt.block_on(stores.tasks.update_lifecycle(&task))?;

    clock.advance(Duration::minutes(1));
    let entry = TaskLogEntry::new(TaskLogKind::Action, AgentRole::Outreach, "mail sent", &clock)
        .with_detail(json!({"to": "buyer@northwind.example"}));
    task.complete(json!({"message_id": "<out-1@mercator>"}), vec![entry], &clock)?;
    rt.block_on(stores.tasks.update_lifecycle(&task))?;

    let stored = rt
        .block_on(stores.tasks.find_by_id(task.id()))?
        .expect("task should be stored");
    assert_eq!(stored, task);
    assert_eq!(stored.status(), TaskStatus::Completed);
    assert_eq!(stored.logs().len(), 1);
    Ok(())
}

#[rstest]
fn list_pending_orders_by_priority_then_age_within_one_organisation(
    shared_test_cluster: &'static TestCluster,
) -> Result<(), BoxError> {
    let db = TestDatabase::from_template(shared_test_cluster, "task_queue")?;
    let stores = db.stores()?;
    let rt = test_runtime()?;
    let clock = clock();
    let organization_id = OrganizationId::new();

    let mut stored = Vec::new();
    for (title, priority) in [("old low", 0), ("urgent", 5), ("new low", 0)] {
        let task = Task::new(
            spec(organization_id, AgentRole::Outreach, title).with_priority(priority),
            &clock,
        )?;
        rt.block_on(stores.tasks.store(&task))?;
        stored.push(task);
        clock.advance(Duration::seconds(1));
    }
    let elsewhere = Task::new(spec(OrganizationId::new(), AgentRole::Outreach, "other org"), &clock)?;
    let other_role = Task::new(spec(organization_id, AgentRole::Accounting, "invoice"), &clock)?;
    let mut claimed = Task::new(
        spec(organization_id, AgentRole::Outreach, "claimed").with_priority(9),
        &clock,
    )?;
    for task in [&elsewhere, &other_role, &claimed] {
        rt.block_on(stores.tasks.store(task))?;
    }
    claimed.start_processing(&clock)?;
    rt.block_on(stores.tasks.update_lifecycle(&claimed))?;

    let pending = rt.block_on(stores.tasks.list_pending(organization_id, AgentRole::Outreach))?;
    let titles: Vec<_> = pending.iter().map(Task::title).collect();
    assert_eq!(titles, ["urgent", "old low", "new low"]);

    let processing = rt.block_on(stores.tasks.list_by_status(TaskStatus::Processing))?;
    assert_eq!(processing.len(), 1);
    assert_eq!(processing[0].id(), claimed.id());
    Ok(())
}

#[rstest]
fn duplicate_and_unknown_tasks_are_reported(
    shared_test_cluster: &'static TestCluster,
) -> Result<(), BoxError> {
    let db = TestDatabase::from_template(shared_test_cluster, "task_errors")?;
    let stores = db.stores()?;
    let rt = test_runtime()?;
    let clock = clock();

    let task = Task::new(spec(OrganizationId::new(), AgentRole::Outreach, "once"), &clock)?;
    rt.block_on(stores.tasks.store(&task))?;
    let duplicate = rt.block_on(stores.tasks.store(&task));
    assert!(matches!(duplicate, Err(TaskRepositoryError::DuplicateTask(id)) if id == task.id()));

    let missing = Task::new(spec(OrganizationId::new(), AgentRole::Outreach, "never"), &clock)?;
    let update = rt.block_on(stores.tasks.update_lifecycle(&missing));
    assert!(matches!(update, Err(TaskRepositoryError::NotFound(id)) if id == missing.id()));
    assert!(rt.block_on(stores.tasks.find_by_id(missing.id()))?.is_none());
    Ok(())
}
