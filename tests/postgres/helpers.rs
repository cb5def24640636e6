//! Shared helpers for `PostgreSQL` integration tests.

use chrono::{DateTime, TimeZone, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use mercator::{
    clock::ManualClock,
    deal::{
        adapters::postgres::{
            DealPgPool, PostgresDealRepository, PostgresLeadRepository,
            PostgresPendingOfferRepository,
        },
        domain::{
            Deal, DealId, Lead, NewLead, OfferDraft, OfferReply, OrganizationId, PendingOffer,
            TaxRate, ThreadRefs,
        },
        ports::{DealRepository, LeadRepository},
    },
    task::adapters::postgres::PostgresTaskRepository,
};
use pg_embedded_setup_unpriv::TestCluster;
use tokio::runtime::Runtime;
use uuid::Uuid;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// SQL creating the pipeline tables.
pub const CREATE_PIPELINE_TABLES_SQL: &str =
    include_str!("../../migrations/2026-03-02-000000_create_pipeline_tables/up.sql");

/// SQL dropping the pipeline tables.
pub const DROP_PIPELINE_TABLES_SQL: &str =
    include_str!("../../migrations/2026-03-02-000000_create_pipeline_tables/down.sql");

/// Template database name for the pre-migrated schema.
pub const TEMPLATE_DB: &str = "mercator_test_template";

/// Creates a runtime for driving the async repositories from sync tests.
pub fn test_runtime() -> Result<Runtime, BoxError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| Box::new(err) as BoxError)
}

/// Fixed instant with whole-second precision so timestamps survive the
/// microsecond round trip through `TIMESTAMPTZ`.
#[must_use]
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Clock starting at [`epoch`].
#[must_use]
pub fn clock() -> ManualClock {
    ManualClock::new(epoch())
}

/// Ensures the template database exists with the migration applied.
pub fn ensure_template(cluster: &TestCluster) -> Result<(), BoxError> {
    cluster
        .ensure_template_exists(TEMPLATE_DB, |db_name| {
            let url = cluster.connection().database_url(db_name);
            let mut conn = PgConnection::establish(&url).map_err(|err| eyre::eyre!("{err}"))?;
            conn.batch_execute(CREATE_PIPELINE_TABLES_SQL)
                .map_err(|err| eyre::eyre!("migration failed: {err}"))?;
            Ok(())
        })
        .map_err(|err| Box::new(err) as BoxError)
}

/// Database cloned from the template and dropped again when the value goes
/// out of scope.
///
/// Declare it before anything holding a connection to it, so those
/// connections close first.
pub struct TestDatabase {
    cluster: &'static TestCluster,
    name: String,
}

impl TestDatabase {
    /// Creates a fresh migrated database named after `prefix`.
    pub fn from_template(cluster: &'static TestCluster, prefix: &str) -> Result<Self, BoxError> {
        ensure_template(cluster)?;
        let name = format!("{prefix}_{}", Uuid::new_v4().simple());
        cluster
            .create_database_from_template(name.as_str(), TEMPLATE_DB)
            .map_err(|err| Box::new(err) as BoxError)?;
        Ok(Self { cluster, name })
    }

    /// Connection URL of this database.
    #[must_use]
    pub fn url(&self) -> String {
        self.cluster.connection().database_url(&self.name)
    }

    /// Opens a raw connection for assertions the repositories do not expose.
    pub fn connect(&self) -> Result<PgConnection, BoxError> {
        PgConnection::establish(&self.url()).map_err(|err| Box::new(err) as BoxError)
    }

    /// Wires every diesel repository to this database.
    pub fn stores(&self) -> Result<Stores, BoxError> {
        let manager = ConnectionManager::<PgConnection>::new(self.url());
        let pool: DealPgPool = Pool::builder()
            .max_size(2)
            .build(manager)
            .map_err(|err| Box::new(err) as BoxError)?;
        Ok(Stores {
            tasks: PostgresTaskRepository::new(pool.clone()),
            deals: PostgresDealRepository::new(pool.clone()),
            leads: PostgresLeadRepository::new(pool.clone()),
            offers: PostgresPendingOfferRepository::new(pool),
        })
    }
}

impl Drop for TestDatabase {
    fn drop(&mut self) {
        drop(self.cluster.drop_database(self.name.as_str()));
    }
}

/// Diesel repositories sharing one pool.
pub struct Stores {
    pub tasks: PostgresTaskRepository,
    pub deals: PostgresDealRepository,
    pub leads: PostgresLeadRepository,
    pub offers: PostgresPendingOfferRepository,
}

/// Builds a lead for `organization_id`.
pub fn lead(
    organization_id: OrganizationId,
    company: &str,
    clock: &ManualClock,
) -> Result<Lead, BoxError> {
    let email = format!("buyer@{}.example", company.to_ascii_lowercase());
    Lead::new(
        organization_id,
        NewLead::new(company, email).with_contact_name("Ada Buyer"),
        clock,
    )
    .map_err(|err| Box::new(err) as BoxError)
}

/// Builds a pending offer for `deal` of `quantity` seats at 25.00 with 20% tax.
pub fn offer(deal: &Deal, quantity: u32, clock: &ManualClock) -> Result<PendingOffer, BoxError> {
    let draft = OfferDraft {
        product: "Route planner".to_owned(),
        quantity,
        unit_price: "25.00".parse().map_err(|err| Box::new(err) as BoxError)?,
        summary: Some(format!("{quantity} seats")),
    };
    let reply = OfferReply {
        subject: "Re: pricing".to_owned(),
        body: "Here is our proposal.".to_owned(),
        thread: ThreadRefs::replying_to("<inbound-1@buyer.example>"),
    };
    let tax_rate = TaxRate::from_basis_points(2_000).map_err(|err| Box::new(err) as BoxError)?;
    PendingOffer::new(
        deal.organization_id(),
        deal.id(),
        draft,
        reply,
        tax_rate,
        clock,
    )
    .map_err(|err| Box::new(err) as BoxError)
}

/// Stores a lead and a deal for it, returning both.
pub async fn seed_deal(
    stores: &Stores,
    organization_id: OrganizationId,
    clock: &ManualClock,
) -> Result<(Lead, Deal), BoxError> {
    let new_lead = lead(organization_id, "Northwind", clock)?;
    stores.leads.store(&new_lead).await?;
    let deal = Deal::new(organization_id, new_lead.id(), clock);
    stores.deals.store(&deal).await?;
    Ok((new_lead, deal))
}

/// Row shape for counting query results.
#[derive(diesel::QueryableByName)]
pub struct CountRow {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub count: i64,
}

/// Counts rows in `table` referencing `deal_id`.
pub fn count_for_deal(
    conn: &mut PgConnection,
    table: &str,
    deal_id: DealId,
) -> Result<i64, BoxError> {
    let sql = format!("SELECT COUNT(*) AS count FROM {table} WHERE deal_id = $1");
    let row = diesel::sql_query(sql)
        .bind::<diesel::sql_types::Uuid, _>(deal_id.into_inner())
        .get_result::<CountRow>(conn)
        .map_err(|err| Box::new(err) as BoxError)?;
    Ok(row.count)
}
