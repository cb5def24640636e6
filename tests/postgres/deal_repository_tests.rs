//! `PostgreSQL` integration tests for leads, deals and pending offers.

use super::helpers::{BoxError, TestDatabase, clock, lead, offer, seed_deal, test_runtime};
use chrono::Duration;
use mercator::deal::{
    domain::{DealStatus, OfferEdits, OfferStatus, OrganizationId, TaxRate},
    ports::{DealRepository, DealRepositoryError, LeadRepository, PendingOfferRepository},
};
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use rstest::rstest;

#[rstest]
fn deal_updates_round_trip_and_stay_within_their_organisation(
    shared_test_cluster: &'static TestCluster,
) -> Result<(), BoxError> {
    let db = TestDatabase::from_template(shared_test_cluster, "deal_round_trip")?;
    let stores = db.stores()?;
    let rt = test_runtime()?;
    let clock = clock();
    let organization_id = OrganizationId::new();
    let (_, mut deal) = rt.block_on(seed_deal(&stores, organization_id, &clock))?;

    clock.advance(Duration::hours(2));
    deal.transition_to(DealStatus::InPipeline, &clock)?;
    deal.record_inbound_reply(1, "a".repeat(64), &clock);
    let priced = offer(&deal, 4, &clock)?;
    deal.apply_pricing(*priced.pricing(), &clock);
    deal.record_follow_up(&clock);
    rt.block_on(stores.deals.update(&deal))?;

    let stored = rt
        .block_on(stores.deals.find(organization_id, deal.id()))?
        .expect("deal should be visible to its organisation");
    assert_eq!(stored, deal);
    assert!(
        rt.block_on(stores.deals.find(OrganizationId::new(), deal.id()))?
            .is_none()
    );

    let in_pipeline = rt.block_on(stores.deals.list_by_status(DealStatus::InPipeline))?;
    assert_eq!(in_pipeline.len(), 1);
    assert!(
        rt.block_on(stores.deals.list_by_status(DealStatus::Contacted))?
            .is_empty()
    );

    let foreign_delete = rt.block_on(stores.deals.delete(OrganizationId::new(), deal.id()));
    assert!(matches!(foreign_delete, Err(DealRepositoryError::DealNotFound(_))));
    Ok(())
}

#[rstest]
fn leads_update_in_place_and_list_distinct_organisations(
    shared_test_cluster: &'static TestCluster,
) -> Result<(), BoxError> {
    let db = TestDatabase::from_template(shared_test_cluster, "lead_round_trip")?;
    let stores = db.stores()?;
    let rt = test_runtime()?;
    let clock = clock();
    let first_org = OrganizationId::new();
    let second_org = OrganizationId::new();

    let mut informed = lead(first_org, "Contoso", &clock)?;
    let sibling = lead(first_org, "Fabrikam", &clock)?;
    let other = lead(second_org, "Tailspin", &clock)?;
    for record in [&informed, &sibling, &other] {
        rt.block_on(stores.leads.store(record))?;
    }

    clock.advance(Duration::minutes(5));
    assert!(informed.mark_informed(&clock));
    rt.block_on(stores.leads.update(&informed))?;
    let reopened = informed.clone_for_reopen(&clock);
    rt.block_on(stores.leads.store(&reopened))?;

    let stored = rt
        .block_on(stores.leads.find(first_org, informed.id()))?
        .expect("lead should be stored");
    assert!(stored.profile().informed_about_offering);
    assert_eq!(stored, informed);
    let clone = rt
        .block_on(stores.leads.find(first_org, reopened.id()))?
        .expect("reopened lead should be stored");
    assert_eq!(clone.cloned_from(), Some(informed.id()));
    assert!(rt.block_on(stores.leads.find(second_org, informed.id()))?.is_none());

    let mut organizations = rt.block_on(stores.leads.organizations())?;
    organizations.sort();
    let mut expected = vec![first_org, second_org];
    expected.sort();
    assert_eq!(organizations, expected);
    Ok(())
}

#[rstest]
fn approving_an_offer_persists_edited_terms_and_clears_the_unresolved_slot(
    shared_test_cluster: &'static TestCluster,
) -> Result<(), BoxError> {
    let db = TestDatabase::from_template(shared_test_cluster, "offer_round_trip")?;
    let stores = db.stores()?;
    let rt = test_runtime()?;
    let clock = clock();
    let organization_id = OrganizationId::new();
    let (_, deal) = rt.block_on(seed_deal(&stores, organization_id, &clock))?;

    let mut held = offer(&deal, 10, &clock)?;
    rt.block_on(stores.offers.store(&held))?;
    let unresolved = rt
        .block_on(stores.offers.find_unresolved_for_deal(deal.id()))?
        .expect("offer should await approval");
    assert_eq!(unresolved, held);

    clock.advance(Duration::hours(1));
    let tax_rate = TaxRate::from_basis_points(2_000)?;
    let edits = OfferEdits::new()
        .with_quantity(12)
        .with_body("Revised proposal for twelve seats.");
    let pricing = held.approve(&edits, tax_rate, &clock)?;
    rt.block_on(stores.offers.update(&held))?;

    assert!(
        rt.block_on(stores.offers.find_unresolved_for_deal(deal.id()))?
            .is_none()
    );
    let stored = rt
        .block_on(stores.offers.find(organization_id, held.id()))?
        .expect("offer should be stored");
    assert_eq!(stored.status(), OfferStatus::Approved);
    assert_eq!(stored.draft().quantity, 12);
    assert_eq!(*stored.pricing(), pricing);
    assert_eq!(stored.reply_body(), "Revised proposal for twelve seats.");
    assert_eq!(stored.thread(), held.thread());
    assert!(
        rt.block_on(stores.offers.find(OrganizationId::new(), held.id()))?
            .is_none()
    );
    Ok(())
}
