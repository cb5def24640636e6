//! Deal state machine and lead lifecycle tests.

use crate::clock::ManualClock;
use crate::deal::domain::{
    Deal, DealDomainError, DealStatus, Lead, LeadId, LeadProfile, NewLead, OrganizationId,
    ParseDealStatusError,
};
use chrono::Duration;
use eyre::{bail, ensure};
use mockable::Clock;
use rstest::{fixture, rstest};

#[fixture]
fn clock() -> ManualClock {
    ManualClock::starting_now()
}

#[fixture]
fn deal(clock: ManualClock) -> (Deal, ManualClock) {
    (Deal::new(OrganizationId::new(), LeadId::new(), &clock), clock)
}

#[rstest]
#[case(DealStatus::Contacted, DealStatus::InPipeline, true)]
#[case(DealStatus::Contacted, DealStatus::ClosedLost, true)]
#[case(DealStatus::Contacted, DealStatus::OfferSent, false)]
#[case(DealStatus::Contacted, DealStatus::ClosedWon, false)]
#[case(DealStatus::InPipeline, DealStatus::OfferSent, true)]
#[case(DealStatus::InPipeline, DealStatus::ClosedLost, true)]
#[case(DealStatus::InPipeline, DealStatus::ClosedWon, false)]
#[case(DealStatus::InPipeline, DealStatus::Contacted, false)]
#[case(DealStatus::OfferSent, DealStatus::OfferSent, true)]
#[case(DealStatus::OfferSent, DealStatus::ClosedWon, true)]
#[case(DealStatus::OfferSent, DealStatus::ClosedLost, true)]
#[case(DealStatus::OfferSent, DealStatus::InPipeline, false)]
#[case(DealStatus::ClosedLost, DealStatus::Reopened, true)]
#[case(DealStatus::ClosedLost, DealStatus::InPipeline, false)]
#[case(DealStatus::ClosedWon, DealStatus::ClosedLost, false)]
#[case(DealStatus::ClosedWon, DealStatus::Reopened, false)]
#[case(DealStatus::Reopened, DealStatus::Contacted, false)]
fn deal_transition_table(
    #[case] from: DealStatus,
    #[case] to: DealStatus,
    #[case] allowed: bool,
) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[rstest]
#[case(DealStatus::Contacted, true)]
#[case(DealStatus::InPipeline, true)]
#[case(DealStatus::OfferSent, true)]
#[case(DealStatus::ClosedWon, false)]
#[case(DealStatus::ClosedLost, false)]
#[case(DealStatus::Reopened, false)]
fn only_open_deals_accept_replies(#[case] status: DealStatus, #[case] replyable: bool) {
    assert_eq!(status.is_replyable(), replyable);
}

#[rstest]
#[case("prospecting", DealStatus::Contacted)]
#[case("negotiating", DealStatus::InPipeline)]
#[case("qualified", DealStatus::InPipeline)]
#[case("proposal_sent", DealStatus::OfferSent)]
#[case("won", DealStatus::ClosedWon)]
#[case("Lost", DealStatus::ClosedLost)]
#[case("offer_sent", DealStatus::OfferSent)]
fn legacy_stage_names_map_to_current_statuses(#[case] raw: &str, #[case] expected: DealStatus) {
    assert_eq!(DealStatus::try_from(raw), Ok(expected));
}

#[rstest]
fn unknown_stage_name_is_rejected() {
    assert_eq!(
        DealStatus::try_from("archived"),
        Err(ParseDealStatusError("archived".to_owned()))
    );
}

#[rstest]
fn closing_stamps_closed_at(deal: (Deal, ManualClock)) -> eyre::Result<()> {
    let (mut current, clock) = deal;
    clock.advance(Duration::hours(3));

    current.transition_to(DealStatus::ClosedLost, &clock)?;

    ensure!(current.status() == DealStatus::ClosedLost);
    ensure!(current.closed_at() == Some(clock.utc()));
    ensure!(current.updated_at() == clock.utc());
    Ok(())
}

#[rstest]
fn forbidden_transition_leaves_deal_untouched(deal: (Deal, ManualClock)) -> eyre::Result<()> {
    let (mut current, clock) = deal;
    let before = current.clone();

    let result = current.transition_to(DealStatus::ClosedWon, &clock);
    let expected = Err(DealDomainError::InvalidStatusTransition {
        deal_id: before.id(),
        from: DealStatus::Contacted,
        to: DealStatus::ClosedWon,
    });

    if result != expected {
        bail!("expected {expected:?}, got {result:?}");
    }
    ensure!(current == before);
    Ok(())
}

#[rstest]
fn round_counter_saturates_and_never_decreases(deal: (Deal, ManualClock)) {
    let (mut current, clock) = deal;

    assert_eq!(current.next_round(5), 1);
    current.record_inbound_reply(4, "fp-1", &clock);
    assert_eq!(current.next_round(5), 5);
    current.record_inbound_reply(5, "fp-2", &clock);
    assert_eq!(current.next_round(5), 5);
    current.record_inbound_reply(2, "fp-3", &clock);

    assert_eq!(current.negotiation_round(), 5);
    assert_eq!(current.last_reply_fingerprint(), Some("fp-3"));
}

#[rstest]
fn invoice_is_recorded_once(deal: (Deal, ManualClock)) {
    let (mut current, clock) = deal;

    current
        .record_invoice("INV-1", &clock)
        .expect("first invoice should record");
    let second = current.record_invoice("INV-2", &clock);

    assert_eq!(
        second,
        Err(DealDomainError::InvoiceAlreadyRecorded(current.id()))
    );
    assert_eq!(current.invoice_ref(), Some("INV-1"));
}

#[rstest]
fn follow_up_counter_reports_new_count(deal: (Deal, ManualClock)) {
    let (mut current, clock) = deal;
    assert_eq!(current.record_follow_up(&clock), 1);
    assert_eq!(current.record_follow_up(&clock), 2);
    assert_eq!(current.follow_up_count(), 2);
}

#[rstest]
#[case("")]
#[case("no-at-sign")]
#[case("@example.com")]
#[case("buyer@localhost")]
fn lead_rejects_malformed_email(clock: ManualClock, #[case] email: &str) {
    let result = Lead::new(OrganizationId::new(), NewLead::new("Acme", email), &clock);
    assert_eq!(result, Err(DealDomainError::InvalidEmail(email.to_owned())));
}

#[rstest]
fn reopened_lead_keeps_profile_under_new_identity(clock: ManualClock) {
    let profile = LeadProfile {
        industry: Some("logistics".to_owned()),
        notes: vec!["prefers quarterly billing".to_owned()],
        informed_about_offering: true,
    };
    let lead = Lead::new(
        OrganizationId::new(),
        NewLead::new("Acme", "buyer@acme.example").with_profile(profile.clone()),
        &clock,
    )
    .expect("valid lead");
    clock.advance(Duration::days(90));

    let clone = lead.clone_for_reopen(&clock);

    assert_ne!(clone.id(), lead.id());
    assert_eq!(clone.cloned_from(), Some(lead.id()));
    assert_eq!(clone.profile(), &profile);
    assert_eq!(clone.email(), lead.email());
    assert_eq!(clone.created_at(), clock.utc());
}

#[rstest]
fn marking_lead_informed_reports_change_once(clock: ManualClock) {
    let mut lead = Lead::new(
        OrganizationId::new(),
        NewLead::new("Acme", "buyer@acme.example"),
        &clock,
    )
    .expect("valid lead");

    assert!(lead.mark_informed(&clock));
    assert!(!lead.mark_informed(&clock));
    assert!(lead.profile().informed_about_offering);
}
