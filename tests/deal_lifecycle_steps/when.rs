//! When steps for deal lifecycle BDD scenarios.

use super::world::{DealLifecycleWorld, run_async};
use chrono::Duration;
use eyre::WrapErr;
use mercator::deal::domain::{Money, OfferEdits};
use rstest_bdd_macros::when;

#[when("{days:i64} days pass without a reply")]
fn days_pass(world: &mut DealLifecycleWorld, days: i64) -> Result<(), eyre::Report> {
    world.pipeline()?.advance(Duration::days(days));
    Ok(())
}

#[when("{minutes:i64} minutes pass")]
fn minutes_pass(world: &mut DealLifecycleWorld, minutes: i64) -> Result<(), eyre::Report> {
    world.pipeline()?.advance(Duration::minutes(minutes));
    Ok(())
}

#[when("the lifecycle poller runs")]
fn poller_runs(world: &mut DealLifecycleWorld) -> Result<(), eyre::Report> {
    let pipeline = world.pipeline()?;
    let sent = world
        .lead
        .as_ref()
        .map_or(0, |lead| pipeline.transport.sent_to(lead.email()).len());
    let report = run_async(pipeline.poller.run_all());
    let failed: Vec<_> = report
        .sweeps
        .iter()
        .filter(|sweep| sweep.tally().is_none())
        .map(|sweep| sweep.kind)
        .collect();
    eyre::ensure!(failed.is_empty(), "sweeps did not complete: {failed:?}");
    world.mails_before_poll = sent;
    Ok(())
}

#[when(r#"the offer is approved with quantity {quantity:u32} and unit price "{price}""#)]
fn offer_approved_with_edits(
    world: &mut DealLifecycleWorld,
    quantity: u32,
    price: String,
) -> Result<(), eyre::Report> {
    let unit_price: Money = price
        .parse()
        .map_err(|err| eyre::eyre!("invalid unit price in scenario: {err}"))?;
    let deal_id = world.deal_id()?;
    let pipeline = world.pipeline()?;
    let edits = OfferEdits::new()
        .with_quantity(quantity)
        .with_unit_price(unit_price);
    let approved = run_async(
        pipeline
            .engine
            .approve_offer(pipeline.organization_id, deal_id, &edits),
    )
    .wrap_err("approve edited offer")?;
    world.approved = Some(approved);
    Ok(())
}
