//! `PostgreSQL` repositories for deals, leads and pending offers.

use super::{
    conversion::{
        deal_to_changeset, deal_to_row, lead_to_row, offer_to_row, row_to_deal, row_to_lead,
        row_to_offer,
    },
    models::{DealRow, LeadRow, PendingOfferRow},
    schema::{deals, leads, pending_offers},
};
use crate::deal::{
    domain::{
        Deal, DealId, DealStatus, Lead, LeadId, OfferStatus, OrganizationId, PendingOffer,
        PendingOfferId,
    },
    ports::{
        DealRepository, DealRepositoryError, DealRepositoryResult, LeadRepository,
        PendingOfferRepository,
    },
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by deal-context adapters.
pub type DealPgPool = Pool<ConnectionManager<PgConnection>>;

async fn run_blocking<F, T>(pool: &DealPgPool, f: F) -> DealRepositoryResult<T>
where
    F: FnOnce(&mut PgConnection) -> DealRepositoryResult<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut connection = pool.get().map_err(DealRepositoryError::persistence)?;
        f(&mut connection)
    })
    .await
    .map_err(DealRepositoryError::persistence)?
}

fn map_insert_error(err: DieselError, duplicate: DealRepositoryError) -> DealRepositoryError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => duplicate,
        other => DealRepositoryError::persistence(other),
    }
}

/// `PostgreSQL`-backed deal repository.
#[derive(Debug, Clone)]
pub struct PostgresDealRepository {
    pool: DealPgPool,
}

impl PostgresDealRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: DealPgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DealRepository for PostgresDealRepository {
    async fn store(&self, deal: &Deal) -> DealRepositoryResult<()> {
        let deal_id = deal.id();
        let row = deal_to_row(deal)?;
        run_blocking(&self.pool, move |connection| {
            diesel::insert_into(deals::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| map_insert_error(err, DealRepositoryError::DuplicateDeal(deal_id)))?;
            Ok(())
        })
        .await
    }

    async fn update(&self, deal: &Deal) -> DealRepositoryResult<()> {
        let deal_id = deal.id();
        let changes = deal_to_changeset(deal)?;
        run_blocking(&self.pool, move |connection| {
            let updated = diesel::update(deals::table.filter(deals::id.eq(deal_id.into_inner())))
                .set(&changes)
                .execute(connection)
                .map_err(DealRepositoryError::persistence)?;
            if updated == 0 {
                return Err(DealRepositoryError::DealNotFound(deal_id));
            }
            Ok(())
        })
        .await
    }

    async fn find(
        &self,
        organization_id: OrganizationId,
        id: DealId,
    ) -> DealRepositoryResult<Option<Deal>> {
        run_blocking(&self.pool, move |connection| {
            let row = deals::table
                .filter(deals::id.eq(id.into_inner()))
                .filter(deals::organization_id.eq(organization_id.into_inner()))
                .select(DealRow::as_select())
                .first::<DealRow>(connection)
                .optional()
                .map_err(DealRepositoryError::persistence)?;
            row.map(row_to_deal).transpose()
        })
        .await
    }

    async fn list_by_status(&self, status: DealStatus) -> DealRepositoryResult<Vec<Deal>> {
        run_blocking(&self.pool, move |connection| {
            let rows = deals::table
                .filter(deals::status.eq(status.as_str()))
                .order(deals::updated_at.asc())
                .select(DealRow::as_select())
                .load::<DealRow>(connection)
                .map_err(DealRepositoryError::persistence)?;
            rows.into_iter().map(row_to_deal).collect()
        })
        .await
    }

    async fn delete(
        &self,
        organization_id: OrganizationId,
        id: DealId,
    ) -> DealRepositoryResult<()> {
        run_blocking(&self.pool, move |connection| {
            let deleted = diesel::delete(
                deals::table
                    .filter(deals::id.eq(id.into_inner()))
                    .filter(deals::organization_id.eq(organization_id.into_inner())),
            )
            .execute(connection)
            .map_err(DealRepositoryError::persistence)?;
            if deleted == 0 {
                return Err(DealRepositoryError::DealNotFound(id));
            }
            Ok(())
        })
        .await
    }
}

/// `PostgreSQL`-backed lead repository.
#[derive(Debug, Clone)]
pub struct PostgresLeadRepository {
    pool: DealPgPool,
}

impl PostgresLeadRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: DealPgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadRepository for PostgresLeadRepository {
    async fn store(&self, lead: &Lead) -> DealRepositoryResult<()> {
        let lead_id = lead.id();
        let row = lead_to_row(lead)?;
        run_blocking(&self.pool, move |connection| {
            diesel::insert_into(leads::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| map_insert_error(err, DealRepositoryError::DuplicateLead(lead_id)))?;
            Ok(())
        })
        .await
    }

    async fn update(&self, lead: &Lead) -> DealRepositoryResult<()> {
        let lead_id = lead.id();
        let row = lead_to_row(lead)?;
        run_blocking(&self.pool, move |connection| {
            let updated = diesel::update(leads::table.filter(leads::id.eq(lead_id.into_inner())))
                .set((
                    leads::company_name.eq(row.company_name),
                    leads::email.eq(row.email),
                    leads::contact_name.eq(row.contact_name),
                    leads::profile.eq(row.profile),
                    leads::updated_at.eq(row.updated_at),
                ))
                .execute(connection)
                .map_err(DealRepositoryError::persistence)?;
            if updated == 0 {
                return Err(DealRepositoryError::LeadNotFound(lead_id));
            }
            Ok(())
        })
        .await
    }

    async fn find(
        &self,
        organization_id: OrganizationId,
        id: LeadId,
    ) -> DealRepositoryResult<Option<Lead>> {
        run_blocking(&self.pool, move |connection| {
            let row = leads::table
                .filter(leads::id.eq(id.into_inner()))
                .filter(leads::organization_id.eq(organization_id.into_inner()))
                .select(LeadRow::as_select())
                .first::<LeadRow>(connection)
                .optional()
                .map_err(DealRepositoryError::persistence)?;
            row.map(row_to_lead).transpose()
        })
        .await
    }

    async fn organizations(&self) -> DealRepositoryResult<Vec<OrganizationId>> {
        run_blocking(&self.pool, move |connection| {
            let ids = leads::table
                .select(leads::organization_id)
                .distinct()
                .order(leads::organization_id.asc())
                .load::<uuid::Uuid>(connection)
                .map_err(DealRepositoryError::persistence)?;
            Ok(ids.into_iter().map(OrganizationId::from_uuid).collect())
        })
        .await
    }
}

/// `PostgreSQL`-backed pending offer repository.
#[derive(Debug, Clone)]
pub struct PostgresPendingOfferRepository {
    pool: DealPgPool,
}

impl PostgresPendingOfferRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: DealPgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PendingOfferRepository for PostgresPendingOfferRepository {
    async fn store(&self, offer: &PendingOffer) -> DealRepositoryResult<()> {
        let offer_id = offer.id();
        let row = offer_to_row(offer)?;
        run_blocking(&self.pool, move |connection| {
            diesel::insert_into(pending_offers::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| {
                    map_insert_error(err, DealRepositoryError::DuplicateOffer(offer_id))
                })?;
            Ok(())
        })
        .await
    }

    async fn update(&self, offer: &PendingOffer) -> DealRepositoryResult<()> {
        let offer_id = offer.id();
        let row = offer_to_row(offer)?;
        run_blocking(&self.pool, move |connection| {
            let updated = diesel::update(
                pending_offers::table.filter(pending_offers::id.eq(offer_id.into_inner())),
            )
            .set((
                pending_offers::draft.eq(row.draft),
                pending_offers::subtotal_cents.eq(row.subtotal_cents),
                pending_offers::tax_cents.eq(row.tax_cents),
                pending_offers::total_cents.eq(row.total_cents),
                pending_offers::reply_subject.eq(row.reply_subject),
                pending_offers::reply_body.eq(row.reply_body),
                pending_offers::status.eq(row.status),
                pending_offers::resolved_at.eq(row.resolved_at),
            ))
            .execute(connection)
            .map_err(DealRepositoryError::persistence)?;
            if updated == 0 {
                return Err(DealRepositoryError::OfferNotFound(offer_id));
            }
            Ok(())
        })
        .await
    }

    async fn find(
        &self,
        organization_id: OrganizationId,
        id: PendingOfferId,
    ) -> DealRepositoryResult<Option<PendingOffer>> {
        run_blocking(&self.pool, move |connection| {
            let row = pending_offers::table
                .filter(pending_offers::id.eq(id.into_inner()))
                .filter(pending_offers::organization_id.eq(organization_id.into_inner()))
                .select(PendingOfferRow::as_select())
                .first::<PendingOfferRow>(connection)
                .optional()
                .map_err(DealRepositoryError::persistence)?;
            row.map(row_to_offer).transpose()
        })
        .await
    }

    async fn find_unresolved_for_deal(
        &self,
        deal_id: DealId,
    ) -> DealRepositoryResult<Option<PendingOffer>> {
        run_blocking(&self.pool, move |connection| {
            let row = pending_offers::table
                .filter(pending_offers::deal_id.eq(deal_id.into_inner()))
                .filter(pending_offers::status.eq(OfferStatus::Pending.as_str()))
                .order(pending_offers::created_at.desc())
                .select(PendingOfferRow::as_select())
                .first::<PendingOfferRow>(connection)
                .optional()
                .map_err(DealRepositoryError::persistence)?;
            row.map(row_to_offer).transpose()
        })
        .await
    }

    async fn list_for_deal(&self, deal_id: DealId) -> DealRepositoryResult<Vec<PendingOffer>> {
        run_blocking(&self.pool, move |connection| {
            let rows = pending_offers::table
                .filter(pending_offers::deal_id.eq(deal_id.into_inner()))
                .order(pending_offers::created_at.asc())
                .select(PendingOfferRow::as_select())
                .load::<PendingOfferRow>(connection)
                .map_err(DealRepositoryError::persistence)?;
            rows.into_iter().map(row_to_offer).collect()
        })
        .await
    }

    async fn delete_for_deal(&self, deal_id: DealId) -> DealRepositoryResult<usize> {
        run_blocking(&self.pool, move |connection| {
            diesel::delete(
                pending_offers::table.filter(pending_offers::deal_id.eq(deal_id.into_inner())),
            )
            .execute(connection)
            .map_err(DealRepositoryError::persistence)
        })
        .await
    }
}
