//! Lifecycle sweeps over deals built through the engine.

use crate::test_helpers::{OUTREACH, Pipeline, decision, pipeline, priced};
use chrono::Duration;
use mercator::{
    deal::domain::{DealId, DealStatus, OfferEdits},
    lifecycle::{domain::SweepKind, services::MANUAL_REVIEW_REASON},
    task::{
        domain::{AgentRole, TaskKind, TaskSpec, TaskStatus},
        services::TaskQueueService,
    },
};
use rstest::rstest;
use serde_json::json;
use std::sync::Arc;

async fn offer_sent(pipeline: &Pipeline) -> Result<DealId, eyre::Report> {
    let (lead, deal_id) = pipeline.open_deal().await?;
    pipeline
        .answer(&lead, deal_id, "Interesting.", decision("discovery", &json!({})))
        .await?;
    pipeline
        .answer(&lead, deal_id, "Quote please.", priced("wants_offer", 4, "25.00"))
        .await?;
    pipeline
        .engine
        .approve_offer(pipeline.organization_id, deal_id, &OfferEdits::new())
        .await?;
    Ok(deal_id)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unanswered_offer_is_followed_up_then_closed(
    pipeline: Result<Pipeline, eyre::Report>,
) -> Result<(), eyre::Report> {
    let pipeline = pipeline?;
    let deal_id = offer_sent(&pipeline).await?;

    for attempt in 1..=3_u32 {
        pipeline.advance(Duration::days(8));
        pipeline.poller.run_all().await;
        let deal = pipeline.deal(deal_id).await?;
        eyre::ensure!(deal.follow_up_count() == attempt, "attempt {attempt}");
        let expected = if attempt < 3 {
            DealStatus::OfferSent
        } else {
            DealStatus::ClosedLost
        };
        eyre::ensure!(deal.status() == expected, "status after attempt {attempt}");
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn lost_deal_comes_back_as_a_fresh_run(
    pipeline: Result<Pipeline, eyre::Report>,
) -> Result<(), eyre::Report> {
    let pipeline = pipeline?;
    let (lead, deal_id) = pipeline.open_deal().await?;
    pipeline
        .answer(&lead, deal_id, "No thanks.", decision("declined", &json!({})))
        .await?;

    pipeline.advance(Duration::days(90));
    pipeline.reasoner.push_response(OUTREACH);
    let report = pipeline.poller.run_all().await;

    let reopened = report
        .sweep(SweepKind::ReopenLost)
        .and_then(|sweep| sweep.tally())
        .ok_or_else(|| eyre::eyre!("reopen sweep did not complete"))?;
    eyre::ensure!(reopened.acted == 1, "one deal reopened");
    eyre::ensure!(
        pipeline.deal(deal_id).await?.status() == DealStatus::Reopened,
        "original deal is terminal"
    );
    let successors = pipeline.stores.deals.list_by_status(DealStatus::Contacted).await?;
    eyre::ensure!(
        successors
            .iter()
            .any(|deal| deal.reopened_from() == Some(deal_id)),
        "successor deal opened"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn crashed_accounting_task_is_never_retried(
    pipeline: Result<Pipeline, eyre::Report>,
) -> Result<(), eyre::Report> {
    let pipeline = pipeline?;
    let spec = TaskSpec::new(
        pipeline.organization_id,
        AgentRole::Orchestrator,
        AgentRole::Accounting,
        TaskKind::IssueInvoice,
        "Issue invoice",
    );
    let queue = TaskQueueService::new(
        Arc::clone(&pipeline.stores.tasks),
        Arc::clone(&pipeline.clock),
    );
    let task_id = queue.create_and_track(spec).await?;

    pipeline.advance(Duration::minutes(11));
    pipeline.poller.run_sweep(SweepKind::StaleTasks).await;

    let task = queue
        .find(pipeline.organization_id, task_id)
        .await?
        .ok_or_else(|| eyre::eyre!("task missing"))?;
    eyre::ensure!(task.status() == TaskStatus::Failed, "task failed");
    eyre::ensure!(task.error() == Some(MANUAL_REVIEW_REASON), "manual review marker");
    eyre::ensure!(pipeline.invoices.calls() == 0, "no invoice issued");
    Ok(())
}
