//! End-to-end deal flows through the public engine surface.

use crate::test_helpers::{Pipeline, decision, pipeline, priced};
use mercator::{
    deal::domain::{DealStatus, Money, OfferEdits, OrganizationId},
    negotiation::domain::ActionTag,
    task::domain::TaskStatus,
    workflow::{domain::ReplyOutcome, services::WorkflowError},
};
use rstest::rstest;
use serde_json::json;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deal_runs_from_outreach_to_invoice(
    pipeline: Result<Pipeline, eyre::Report>,
) -> Result<(), eyre::Report> {
    let pipeline = pipeline?;
    let (lead, deal_id) = pipeline.open_deal().await?;

    pipeline
        .answer(&lead, deal_id, "Sounds useful.", decision("discovery", &json!({})))
        .await?;
    let held = pipeline
        .answer(&lead, deal_id, "Price for ten?", priced("wants_offer", 10, "90.00"))
        .await?;
    eyre::ensure!(
        matches!(
            held,
            ReplyOutcome::Processed {
                action: ActionTag::WantsOffer,
                pending_offer: Some(_),
                ..
            }
        ),
        "pricing reply should hold an offer: {held:?}"
    );

    let edits = OfferEdits::new()
        .with_quantity(3)
        .with_unit_price(Money::from_cents(10_000));
    let approved = pipeline
        .engine
        .approve_offer(pipeline.organization_id, deal_id, &edits)
        .await?;
    eyre::ensure!(approved.pricing.total().cents() == 37_200, "total mismatch");
    eyre::ensure!(
        pipeline.deal(deal_id).await?.status() == DealStatus::OfferSent,
        "approval sends the offer"
    );

    pipeline
        .answer(&lead, deal_id, "Agreed.", decision("accepted", &json!({})))
        .await?;
    let won = pipeline.deal(deal_id).await?;
    eyre::ensure!(won.status() == DealStatus::ClosedWon, "deal should be won");
    eyre::ensure!(won.invoice_ref() == Some("INV-00001"), "invoice recorded");
    eyre::ensure!(pipeline.invoices.issued_count() == 1, "one invoice issued");

    let tasks = pipeline.stores.tasks.find_by_deal(deal_id).await?;
    eyre::ensure!(
        tasks
            .iter()
            .filter(|task| task.status() == TaskStatus::Completed)
            .count()
            >= 5,
        "every performed step is tracked as a completed task"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn same_reply_is_processed_once(
    pipeline: Result<Pipeline, eyre::Report>,
) -> Result<(), eyre::Report> {
    let pipeline = pipeline?;
    let (lead, deal_id) = pipeline.open_deal().await?;
    pipeline
        .answer(&lead, deal_id, "Tell me more.", decision("discovery", &json!({})))
        .await?;

    let again = pipeline
        .engine
        .check_reply(pipeline.organization_id, deal_id)
        .await?;

    eyre::ensure!(again == ReplyOutcome::Duplicate, "unexpected {again:?}");
    eyre::ensure!(pipeline.deal(deal_id).await?.negotiation_round() == 1, "round kept");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn foreign_organisation_cannot_touch_a_deal(
    pipeline: Result<Pipeline, eyre::Report>,
) -> Result<(), eyre::Report> {
    let pipeline = pipeline?;
    let (_, deal_id) = pipeline.open_deal().await?;

    let result = pipeline
        .engine
        .check_reply(OrganizationId::new(), deal_id)
        .await;

    eyre::ensure!(
        matches!(result, Err(WorkflowError::DealNotFound(id)) if id == deal_id),
        "foreign lookup must not find the deal"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn purge_removes_deal_and_offers_and_fails_open_tasks(
    pipeline: Result<Pipeline, eyre::Report>,
) -> Result<(), eyre::Report> {
    let pipeline = pipeline?;
    let (lead, deal_id) = pipeline.open_deal().await?;
    pipeline
        .answer(&lead, deal_id, "Sounds useful.", decision("discovery", &json!({})))
        .await?;
    pipeline
        .answer(&lead, deal_id, "Price?", priced("wants_offer", 2, "50.00"))
        .await?;

    let report = pipeline
        .engine
        .purge_deal(pipeline.organization_id, deal_id)
        .await?;

    eyre::ensure!(report.offers_deleted == 1, "offer cascaded");
    eyre::ensure!(report.tasks_failed == 1, "approval notification failed");
    eyre::ensure!(
        pipeline
            .stores
            .deals
            .find(pipeline.organization_id, deal_id)
            .await?
            .is_none(),
        "deal deleted"
    );
    let tasks = pipeline.stores.tasks.find_by_deal(deal_id).await?;
    eyre::ensure!(
        tasks.iter().all(|task| task.status().is_terminal()),
        "no open task remains"
    );
    Ok(())
}
