//! Diesel schema for task persistence.

diesel::table! {
    /// Task queue records.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Owning organisation.
        organization_id -> Uuid,
        /// Producing role.
        #[max_length = 50]
        source_role -> Varchar,
        /// Consuming role.
        #[max_length = 50]
        target_role -> Varchar,
        /// Task kind.
        #[max_length = 50]
        kind -> Varchar,
        /// Title.
        #[max_length = 255]
        title -> Varchar,
        /// Description.
        description -> Nullable<Text>,
        /// Input payload.
        input -> Jsonb,
        /// Output payload.
        output -> Nullable<Jsonb>,
        /// Failure message.
        error -> Nullable<Text>,
        /// Lifecycle status.
        #[max_length = 50]
        status -> Varchar,
        /// Priority, higher first.
        priority -> Int4,
        /// Linked deal, nulled when the deal is deleted.
        deal_id -> Nullable<Uuid>,
        /// Linked lead.
        lead_id -> Nullable<Uuid>,
        /// Flushed log entries.
        logs -> Jsonb,
        /// Attempt number.
        attempt -> Int4,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Processing start timestamp.
        started_at -> Nullable<Timestamptz>,
        /// Termination timestamp.
        completed_at -> Nullable<Timestamptz>,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}
