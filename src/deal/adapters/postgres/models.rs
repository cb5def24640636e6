//! Diesel row models for deal-context persistence.

use super::schema::{deals, leads, pending_offers};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query and insert row for lead records.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = leads)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LeadRow {
    /// Lead identifier.
    pub id: uuid::Uuid,
    /// Owning organisation.
    pub organization_id: uuid::Uuid,
    /// Company name.
    pub company_name: String,
    /// Contact email address.
    pub email: String,
    /// Contact person's name.
    pub contact_name: Option<String>,
    /// Profile JSON payload.
    pub profile: Value,
    /// Source lead on reopening.
    pub cloned_from: Option<uuid::Uuid>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query and insert row for deal records.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = deals)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DealRow {
    /// Deal identifier.
    pub id: uuid::Uuid,
    /// Owning organisation.
    pub organization_id: uuid::Uuid,
    /// Lead identifier.
    pub lead_id: uuid::Uuid,
    /// Pipeline stage.
    pub status: String,
    /// Committed subtotal in cents.
    pub subtotal_cents: Option<i64>,
    /// Committed tax in cents.
    pub tax_cents: Option<i64>,
    /// Committed total in cents.
    pub total_cents: Option<i64>,
    /// Processed inbound replies.
    pub negotiation_round: i32,
    /// Follow-ups sent.
    pub follow_up_count: i32,
    /// Satisfaction flag.
    pub satisfaction_notified: bool,
    /// Invoice reference.
    pub invoice_ref: Option<String>,
    /// Last reply fingerprint.
    pub last_reply_fingerprint: Option<String>,
    /// Predecessor deal.
    pub reopened_from: Option<uuid::Uuid>,
    /// Closing timestamp.
    pub closed_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Columns a deal update is allowed to write.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = deals)]
#[diesel(treat_none_as_null = true)]
pub struct DealChangeset {
    /// Pipeline stage.
    pub status: String,
    /// Committed subtotal in cents.
    pub subtotal_cents: Option<i64>,
    /// Committed tax in cents.
    pub tax_cents: Option<i64>,
    /// Committed total in cents.
    pub total_cents: Option<i64>,
    /// Processed inbound replies.
    pub negotiation_round: i32,
    /// Follow-ups sent.
    pub follow_up_count: i32,
    /// Satisfaction flag.
    pub satisfaction_notified: bool,
    /// Invoice reference.
    pub invoice_ref: Option<String>,
    /// Last reply fingerprint.
    pub last_reply_fingerprint: Option<String>,
    /// Closing timestamp.
    pub closed_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query and insert row for pending offer records.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = pending_offers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PendingOfferRow {
    /// Offer identifier.
    pub id: uuid::Uuid,
    /// Owning organisation.
    pub organization_id: uuid::Uuid,
    /// Deal identifier.
    pub deal_id: uuid::Uuid,
    /// Drafted terms payload.
    pub draft: Value,
    /// Subtotal in cents.
    pub subtotal_cents: i64,
    /// Tax in cents.
    pub tax_cents: i64,
    /// Total in cents.
    pub total_cents: i64,
    /// Reply subject.
    pub reply_subject: String,
    /// Reply body.
    pub reply_body: String,
    /// Threading payload.
    pub thread: Value,
    /// Approval state.
    pub status: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Resolution timestamp.
    pub resolved_at: Option<DateTime<Utc>>,
}
