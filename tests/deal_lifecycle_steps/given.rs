//! Given steps for deal lifecycle BDD scenarios.

use super::world::{DealLifecycleWorld, run_async};
use crate::test_helpers::{decision, priced};
use eyre::WrapErr;
use mercator::{
    deal::domain::{Deal, OfferEdits, PersistedDealData},
    task::{
        domain::{AgentRole, TaskKind, TaskSpec},
        services::TaskQueueService,
    },
};
use rstest_bdd_macros::given;
use serde_json::json;
use std::sync::Arc;

fn open_offer_request(world: &mut DealLifecycleWorld) -> Result<(), eyre::Report> {
    let pipeline = world.pipeline()?;
    let (lead, deal_id) = run_async(pipeline.open_deal()).wrap_err("open deal")?;
    run_async(pipeline.answer(
        &lead,
        deal_id,
        "Tell me more.",
        decision("discovery", &json!({})),
    ))
    .wrap_err("discovery reply")?;
    run_async(pipeline.answer(
        &lead,
        deal_id,
        "Send us a quote.",
        priced("wants_offer", 4, "25.00"),
    ))
    .wrap_err("offer request")?;
    world.lead = Some(lead);
    world.deal_id = Some(deal_id);
    Ok(())
}

#[given("a deal with a pending offer")]
fn deal_with_pending_offer(world: &mut DealLifecycleWorld) -> Result<(), eyre::Report> {
    open_offer_request(world)
}

#[given("a deal with a sent offer")]
fn deal_with_sent_offer(world: &mut DealLifecycleWorld) -> Result<(), eyre::Report> {
    open_offer_request(world)?;
    let deal_id = world.deal_id()?;
    let pipeline = world.pipeline()?;
    run_async(
        pipeline
            .engine
            .approve_offer(pipeline.organization_id, deal_id, &OfferEdits::new()),
    )
    .wrap_err("approve drafted offer")?;
    Ok(())
}

#[given("the deal has {count:u32} follow-ups")]
fn deal_has_follow_ups(world: &mut DealLifecycleWorld, count: u32) -> Result<(), eyre::Report> {
    let deal_id = world.deal_id()?;
    let pipeline = world.pipeline()?;
    let deal = run_async(pipeline.deal(deal_id))?;
    let rewritten = Deal::from_persisted(PersistedDealData {
        id: deal.id(),
        organization_id: deal.organization_id(),
        lead_id: deal.lead_id(),
        status: deal.status(),
        pricing: deal.pricing().copied(),
        negotiation_round: deal.negotiation_round(),
        follow_up_count: count,
        satisfaction_notified: deal.satisfaction_notified(),
        invoice_ref: deal.invoice_ref().map(str::to_owned),
        last_reply_fingerprint: deal.last_reply_fingerprint().map(str::to_owned),
        reopened_from: deal.reopened_from(),
        closed_at: deal.closed_at(),
        created_at: deal.created_at(),
        updated_at: deal.updated_at(),
    });
    run_async(pipeline.stores.deals.update(&rewritten)).wrap_err("rewrite follow-up count")?;
    Ok(())
}

#[given("an invoice task that is processing")]
fn invoice_task_processing(world: &mut DealLifecycleWorld) -> Result<(), eyre::Report> {
    let pipeline = world.pipeline()?;
    let queue = TaskQueueService::new(
        Arc::clone(&pipeline.stores.tasks),
        Arc::clone(&pipeline.clock),
    );
    let spec = TaskSpec::new(
        pipeline.organization_id,
        AgentRole::Orchestrator,
        AgentRole::Accounting,
        TaskKind::IssueInvoice,
        "Issue invoice",
    );
    let task_id = run_async(queue.create_and_track(spec)).wrap_err("track invoice task")?;
    world.task_id = Some(task_id);
    Ok(())
}
