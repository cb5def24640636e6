//! Row/domain conversions for deal-context persistence.

use super::models::{DealChangeset, DealRow, LeadRow, PendingOfferRow};
use crate::deal::{
    domain::{
        Deal, DealId, DealStatus, Lead, LeadId, Money, OfferStatus, OrganizationId, PendingOffer,
        PendingOfferId, PersistedDealData, PersistedLeadData, PersistedOfferData, Pricing,
    },
    ports::{DealRepositoryError, DealRepositoryResult},
};

pub(crate) fn lead_to_row(lead: &Lead) -> DealRepositoryResult<LeadRow> {
    let profile = serde_json::to_value(lead.profile()).map_err(DealRepositoryError::persistence)?;
    Ok(LeadRow {
        id: lead.id().into_inner(),
        organization_id: lead.organization_id().into_inner(),
        company_name: lead.company_name().to_owned(),
        email: lead.email().to_owned(),
        contact_name: lead.contact_name().map(str::to_owned),
        profile,
        cloned_from: lead.cloned_from().map(LeadId::into_inner),
        created_at: lead.created_at(),
        updated_at: lead.updated_at(),
    })
}

pub(crate) fn row_to_lead(row: LeadRow) -> DealRepositoryResult<Lead> {
    let profile = serde_json::from_value(row.profile).map_err(DealRepositoryError::persistence)?;
    Ok(Lead::from_persisted(PersistedLeadData {
        id: LeadId::from_uuid(row.id),
        organization_id: OrganizationId::from_uuid(row.organization_id),
        company_name: row.company_name,
        email: row.email,
        contact_name: row.contact_name,
        profile,
        cloned_from: row.cloned_from.map(LeadId::from_uuid),
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

pub(crate) fn deal_to_row(deal: &Deal) -> DealRepositoryResult<DealRow> {
    let changes = deal_to_changeset(deal)?;
    Ok(DealRow {
        id: deal.id().into_inner(),
        organization_id: deal.organization_id().into_inner(),
        lead_id: deal.lead_id().into_inner(),
        status: changes.status,
        subtotal_cents: changes.subtotal_cents,
        tax_cents: changes.tax_cents,
        total_cents: changes.total_cents,
        negotiation_round: changes.negotiation_round,
        follow_up_count: changes.follow_up_count,
        satisfaction_notified: changes.satisfaction_notified,
        invoice_ref: changes.invoice_ref,
        last_reply_fingerprint: changes.last_reply_fingerprint,
        reopened_from: deal.reopened_from().map(DealId::into_inner),
        closed_at: changes.closed_at,
        created_at: deal.created_at(),
        updated_at: changes.updated_at,
    })
}

pub(crate) fn deal_to_changeset(deal: &Deal) -> DealRepositoryResult<DealChangeset> {
    let pricing = deal.pricing();
    Ok(DealChangeset {
        status: deal.status().as_str().to_owned(),
        subtotal_cents: pricing.map(|p| p.subtotal().cents()),
        tax_cents: pricing.map(|p| p.tax().cents()),
        total_cents: pricing.map(|p| p.total().cents()),
        negotiation_round: to_db_counter(deal.negotiation_round())?,
        follow_up_count: to_db_counter(deal.follow_up_count())?,
        satisfaction_notified: deal.satisfaction_notified(),
        invoice_ref: deal.invoice_ref().map(str::to_owned),
        last_reply_fingerprint: deal.last_reply_fingerprint().map(str::to_owned),
        closed_at: deal.closed_at(),
        updated_at: deal.updated_at(),
    })
}

pub(crate) fn row_to_deal(row: DealRow) -> DealRepositoryResult<Deal> {
    let status =
        DealStatus::try_from(row.status.as_str()).map_err(DealRepositoryError::persistence)?;
    let pricing = match (row.subtotal_cents, row.tax_cents, row.total_cents) {
        (Some(subtotal), Some(tax), Some(total)) => Some(
            Pricing::from_parts(
                Money::from_cents(subtotal),
                Money::from_cents(tax),
                Money::from_cents(total),
            )
            .map_err(DealRepositoryError::persistence)?,
        ),
        (None, None, None) => None,
        _ => {
            return Err(DealRepositoryError::persistence(std::io::Error::other(
                "partially stored deal pricing",
            )));
        }
    };

    Ok(Deal::from_persisted(PersistedDealData {
        id: DealId::from_uuid(row.id),
        organization_id: OrganizationId::from_uuid(row.organization_id),
        lead_id: LeadId::from_uuid(row.lead_id),
        status,
        pricing,
        negotiation_round: from_db_counter(row.negotiation_round)?,
        follow_up_count: from_db_counter(row.follow_up_count)?,
        satisfaction_notified: row.satisfaction_notified,
        invoice_ref: row.invoice_ref,
        last_reply_fingerprint: row.last_reply_fingerprint,
        reopened_from: row.reopened_from.map(DealId::from_uuid),
        closed_at: row.closed_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

pub(crate) fn offer_to_row(offer: &PendingOffer) -> DealRepositoryResult<PendingOfferRow> {
    let draft = serde_json::to_value(offer.draft()).map_err(DealRepositoryError::persistence)?;
    let thread = serde_json::to_value(offer.thread()).map_err(DealRepositoryError::persistence)?;
    let pricing = offer.pricing();
    Ok(PendingOfferRow {
        id: offer.id().into_inner(),
        organization_id: offer.organization_id().into_inner(),
        deal_id: offer.deal_id().into_inner(),
        draft,
        subtotal_cents: pricing.subtotal().cents(),
        tax_cents: pricing.tax().cents(),
        total_cents: pricing.total().cents(),
        reply_subject: offer.reply_subject().to_owned(),
        reply_body: offer.reply_body().to_owned(),
        thread,
        status: offer.status().as_str().to_owned(),
        created_at: offer.created_at(),
        resolved_at: offer.resolved_at(),
    })
}

pub(crate) fn row_to_offer(row: PendingOfferRow) -> DealRepositoryResult<PendingOffer> {
    let draft = serde_json::from_value(row.draft).map_err(DealRepositoryError::persistence)?;
    let thread = serde_json::from_value(row.thread).map_err(DealRepositoryError::persistence)?;
    let status =
        OfferStatus::try_from(row.status.as_str()).map_err(DealRepositoryError::persistence)?;
    let pricing = Pricing::from_parts(
        Money::from_cents(row.subtotal_cents),
        Money::from_cents(row.tax_cents),
        Money::from_cents(row.total_cents),
    )
    .map_err(DealRepositoryError::persistence)?;

    Ok(PendingOffer::from_persisted(PersistedOfferData {
        id: PendingOfferId::from_uuid(row.id),
        organization_id: OrganizationId::from_uuid(row.organization_id),
        deal_id: DealId::from_uuid(row.deal_id),
        draft,
        pricing,
        reply_subject: row.reply_subject,
        reply_body: row.reply_body,
        thread,
        status,
        created_at: row.created_at,
        resolved_at: row.resolved_at,
    }))
}

fn to_db_counter(value: u32) -> DealRepositoryResult<i32> {
    i32::try_from(value).map_err(DealRepositoryError::persistence)
}

fn from_db_counter(value: i32) -> DealRepositoryResult<u32> {
    u32::try_from(value).map_err(DealRepositoryError::persistence)
}
