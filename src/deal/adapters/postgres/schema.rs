//! Diesel schema for deal-context persistence.

diesel::table! {
    /// Counterpart records.
    leads (id) {
        /// Lead identifier.
        id -> Uuid,
        /// Owning organisation.
        organization_id -> Uuid,
        /// Company name.
        #[max_length = 255]
        company_name -> Varchar,
        /// Contact email address.
        #[max_length = 320]
        email -> Varchar,
        /// Contact person's name.
        #[max_length = 255]
        contact_name -> Nullable<Varchar>,
        /// Accumulated profile payload.
        profile -> Jsonb,
        /// Lead this one was cloned from on reopening.
        cloned_from -> Nullable<Uuid>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Deal records; `status` holds the pipeline stage.
    deals (id) {
        /// Deal identifier.
        id -> Uuid,
        /// Owning organisation.
        organization_id -> Uuid,
        /// Lead the deal is negotiated with.
        lead_id -> Uuid,
        /// Pipeline stage.
        #[max_length = 50]
        status -> Varchar,
        /// Committed subtotal in cents.
        subtotal_cents -> Nullable<Int8>,
        /// Committed tax in cents.
        tax_cents -> Nullable<Int8>,
        /// Committed total in cents.
        total_cents -> Nullable<Int8>,
        /// Processed inbound replies.
        negotiation_round -> Int4,
        /// Follow-ups sent.
        follow_up_count -> Int4,
        /// Whether the satisfaction message was sent.
        satisfaction_notified -> Bool,
        /// Issued invoice reference.
        #[max_length = 255]
        invoice_ref -> Nullable<Varchar>,
        /// Fingerprint of the last processed reply.
        #[max_length = 64]
        last_reply_fingerprint -> Nullable<Varchar>,
        /// Deal this one was reopened from.
        reopened_from -> Nullable<Uuid>,
        /// Closing timestamp.
        closed_at -> Nullable<Timestamptz>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Offer drafts awaiting approval.
    pending_offers (id) {
        /// Offer identifier.
        id -> Uuid,
        /// Owning organisation.
        organization_id -> Uuid,
        /// Deal the offer belongs to.
        deal_id -> Uuid,
        /// Drafted terms payload.
        draft -> Jsonb,
        /// Subtotal in cents.
        subtotal_cents -> Int8,
        /// Tax in cents.
        tax_cents -> Int8,
        /// Total in cents.
        total_cents -> Int8,
        /// Reply subject.
        reply_subject -> Text,
        /// Reply body.
        reply_body -> Text,
        /// Threading references payload.
        thread -> Jsonb,
        /// Approval state.
        #[max_length = 50]
        status -> Varchar,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Resolution timestamp.
        resolved_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(deals -> leads (lead_id));
diesel::joinable!(pending_offers -> deals (deal_id));
diesel::allow_tables_to_appear_in_same_query!(leads, deals, pending_offers);
