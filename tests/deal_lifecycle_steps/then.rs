//! Then steps for deal lifecycle BDD scenarios.

use super::world::{DealLifecycleWorld, run_async};
use eyre::WrapErr;
use mercator::{
    deal::domain::{DealStatus, Pricing},
    lifecycle::services::MANUAL_REVIEW_REASON,
    task::{domain::TaskStatus, services::TaskQueueService},
};
use rstest_bdd_macros::then;
use std::sync::Arc;

#[then(r#"the deal status is "{status}""#)]
fn deal_status_is(world: &DealLifecycleWorld, status: String) -> Result<(), eyre::Report> {
    let expected = DealStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let deal = run_async(world.pipeline()?.deal(world.deal_id()?))?;
    eyre::ensure!(
        deal.status() == expected,
        "expected status {expected}, found {}",
        deal.status()
    );
    Ok(())
}

#[then("the deal has {count:u32} follow-ups")]
fn deal_follow_ups_are(world: &DealLifecycleWorld, count: u32) -> Result<(), eyre::Report> {
    let deal = run_async(world.pipeline()?.deal(world.deal_id()?))?;
    eyre::ensure!(
        deal.follow_up_count() == count,
        "expected {count} follow-ups, found {}",
        deal.follow_up_count()
    );
    Ok(())
}

#[then("{count:usize} follow-up mail was sent")]
fn follow_up_mails_sent(world: &DealLifecycleWorld, count: usize) -> Result<(), eyre::Report> {
    let lead = world.lead()?;
    let sent = world.pipeline()?.transport.sent_to(lead.email());
    let new_mails = sent.len().saturating_sub(world.mails_before_poll);
    eyre::ensure!(new_mails == count, "expected {count} new mails, found {new_mails}");
    eyre::ensure!(
        sent.last()
            .is_some_and(|mail| mail.subject.starts_with("Following up")),
        "last mail is not a follow-up"
    );
    Ok(())
}

#[then("the task is failed for manual review")]
fn task_failed_for_manual_review(world: &DealLifecycleWorld) -> Result<(), eyre::Report> {
    let pipeline = world.pipeline()?;
    let task_id = world
        .task_id
        .ok_or_else(|| eyre::eyre!("missing task in scenario world"))?;
    let queue = TaskQueueService::new(
        Arc::clone(&pipeline.stores.tasks),
        Arc::clone(&pipeline.clock),
    );
    let task = run_async(queue.find(pipeline.organization_id, task_id))
        .wrap_err("look up recovered task")?
        .ok_or_else(|| eyre::eyre!("task {task_id} not found"))?;
    eyre::ensure!(task.status() == TaskStatus::Failed, "task is {}", task.status());
    eyre::ensure!(
        task.error() == Some(MANUAL_REVIEW_REASON),
        "unexpected failure reason {:?}",
        task.error()
    );
    Ok(())
}

#[then("no invoice was issued")]
fn no_invoice_issued(world: &DealLifecycleWorld) -> Result<(), eyre::Report> {
    let calls = world.pipeline()?.invoices.calls();
    eyre::ensure!(calls == 0, "invoice issuer was called {calls} times");
    Ok(())
}

fn approved_pricing(world: &DealLifecycleWorld) -> Result<Pricing, eyre::Report> {
    world
        .approved
        .as_ref()
        .map(|approved| approved.pricing)
        .ok_or_else(|| eyre::eyre!("offer was not approved"))
}

fn ensure_amount(label: &str, actual: impl ToString, expected: &str) -> Result<(), eyre::Report> {
    let actual = actual.to_string();
    eyre::ensure!(actual == expected, "expected {label} {expected}, found {actual}");
    Ok(())
}

#[then(r#"the offer subtotal is "{amount}""#)]
fn offer_subtotal_is(world: &DealLifecycleWorld, amount: String) -> Result<(), eyre::Report> {
    ensure_amount("subtotal", approved_pricing(world)?.subtotal(), &amount)
}

#[then(r#"the offer tax is "{amount}""#)]
fn offer_tax_is(world: &DealLifecycleWorld, amount: String) -> Result<(), eyre::Report> {
    ensure_amount("tax", approved_pricing(world)?.tax(), &amount)
}

#[then(r#"the offer total is "{amount}""#)]
fn offer_total_is(world: &DealLifecycleWorld, amount: String) -> Result<(), eyre::Report> {
    ensure_amount("total", approved_pricing(world)?.total(), &amount)
}
