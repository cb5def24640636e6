//! `PostgreSQL` adapters for deal-context persistence.

mod conversion;
mod models;
mod repository;
mod schema;

pub use repository::{
    DealPgPool, PostgresDealRepository, PostgresLeadRepository, PostgresPendingOfferRepository,
};

#[cfg(test)]
pub(crate) use {
    conversion::{deal_to_row, row_to_deal, row_to_offer},
    models::{DealRow, PendingOfferRow},
};
