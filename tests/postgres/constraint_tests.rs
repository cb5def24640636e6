//! `PostgreSQL` integration tests for schema constraints and the migration.

use super::helpers::{
    BoxError, CREATE_PIPELINE_TABLES_SQL, DROP_PIPELINE_TABLES_SQL, TestDatabase, clock,
    count_for_deal, offer, seed_deal, test_runtime,
};
use chrono::Duration;
use diesel::connection::SimpleConnection;
use mercator::deal::{
    domain::{Deal, DealStatus, OrganizationId},
    ports::{DealRepository, DealRepositoryError, PendingOfferRepository},
};
use mercator::task::{
    domain::{AgentRole, Task, TaskKind, TaskSpec},
    ports::TaskRepository,
};
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use rstest::rstest;
use serde_json::json;

#[rstest]
fn a_deal_holds_at_most_one_unresolved_offer(
    shared_test_cluster: &'static TestCluster,
) -> Result<(), BoxError> {
    let db = TestDatabase::from_template(shared_test_cluster, "offer_unique")?;
    let stores = db.stores()?;
    let rt = test_runtime()?;
    let clock = clock();
    let (_, deal) = rt.block_on(seed_deal(&stores, OrganizationId::new(), &clock))?;

    let mut first = offer(&deal, 5, &clock)?;
    rt.block_on(stores.offers.store(&first))?;
    clock.advance(Duration::minutes(10));
    let second = offer(&deal, 8, &clock)?;
    let rejected = rt.block_on(stores.offers.store(&second));
    assert!(
        matches!(rejected, Err(DealRepositoryError::DuplicateOffer(id)) if id == second.id()),
        "second unresolved offer must be refused, got {rejected:?}"
    );

    first.reject(&clock)?;
    rt.block_on(stores.offers.update(&first))?;
    rt.block_on(stores.offers.store(&second))?;

    let offers = rt.block_on(stores.offers.list_for_deal(deal.id()))?;
    let quantities: Vec<_> = offers.iter().map(|held| held.draft().quantity).collect();
    assert_eq!(quantities, [5, 8]);
    let unresolved = rt
        .block_on(stores.offers.find_unresolved_for_deal(deal.id()))?
        .expect("the newer offer should await approval");
    assert_eq!(unresolved.id(), second.id());
    Ok(())
}

#[rstest]
fn deleting_a_deal_drops_its_offers_and_detaches_its_tasks(
    shared_test_cluster: &'static TestCluster,
) -> Result<(), BoxError> {
    let db = TestDatabase::from_template(shared_test_cluster, "deal_cascade")?;
    let stores = db.stores()?;
    let rt = test_runtime()?;
    let clock = clock();
    let organization_id = OrganizationId::new();
    let (lead, deal) = rt.block_on(seed_deal(&stores, organization_id, &clock))?;

    rt.block_on(stores.offers.store(&offer(&deal, 3, &clock)?))?;
    let task = Task::new(
        TaskSpec::new(
            organization_id,
            AgentRole::Negotiation,
            AgentRole::Notification,
            TaskKind::NotifyOfferApproval,
            "Offer awaits approval",
        )
        .with_deal(deal.id())
        .with_lead(lead.id())
        .with_input(json!({"deal_id": deal.id()})),
        &clock,
    )?;
    rt.block_on(stores.tasks.store(&task))?;
    assert_eq!(rt.block_on(stores.tasks.find_by_deal(deal.id()))?.len(), 1);

    rt.block_on(stores.deals.delete(organization_id, deal.id()))?;

    let mut conn = db.connect()?;
    assert_eq!(count_for_deal(&mut conn, "pending_offers", deal.id())?, 0);
    assert_eq!(count_for_deal(&mut conn, "tasks", deal.id())?, 0);
    let detached = rt
        .block_on(stores.tasks.find_by_id(task.id()))?
        .expect("task history outlives the deal");
    assert_eq!(detached.deal_id(), None);
    assert_eq!(detached.lead_id(), Some(lead.id()));
    Ok(())
}

#[rstest]
fn an_invoice_reference_belongs_to_one_deal(
    shared_test_cluster: &'static TestCluster,
) -> Result<(), BoxError> {
    let db = TestDatabase::from_template(shared_test_cluster, "invoice_unique")?;
    let stores = db.stores()?;
    let rt = test_runtime()?;
    let clock = clock();
    let organization_id = OrganizationId::new();
    let (lead, mut won) = rt.block_on(seed_deal(&stores, organization_id, &clock))?;
    let mut other = Deal::new(organization_id, lead.id(), &clock);
    rt.block_on(stores.deals.store(&other))?;

    for deal in [&mut won, &mut other] {
        deal.transition_to(DealStatus::InPipeline, &clock)?;
        deal.transition_to(DealStatus::OfferSent, &clock)?;
        deal.transition_to(DealStatus::ClosedWon, &clock)?;
        deal.record_invoice("INV-2026-0001", &clock)?;
    }
    rt.block_on(stores.deals.update(&won))?;
    let clash = rt.block_on(stores.deals.update(&other));
    assert!(
        matches!(clash, Err(DealRepositoryError::Persistence(_))),
        "reused invoice reference must be refused, got {clash:?}"
    );
    Ok(())
}

#[rstest]
fn down_migration_removes_every_table_and_up_reapplies(
    shared_test_cluster: &'static TestCluster,
) -> Result<(), BoxError> {
    let db = TestDatabase::from_template(shared_test_cluster, "migration_cycle")?;
    let mut conn = db.connect()?;

    conn.batch_execute(DROP_PIPELINE_TABLES_SQL)?;
    let missing = conn.batch_execute("SELECT 1 FROM deals");
    assert!(missing.is_err(), "deals table should be gone");

    conn.batch_execute(CREATE_PIPELINE_TABLES_SQL)?;
    drop(conn);

    let stores = db.stores()?;
    let rt = test_runtime()?;
    let (_, deal) = rt.block_on(seed_deal(&stores, OrganizationId::new(), &clock()))?;
    let found = rt.block_on(stores.deals.find(deal.organization_id(), deal.id()))?;
    assert_eq!(found, Some(deal));
    Ok(())
}
