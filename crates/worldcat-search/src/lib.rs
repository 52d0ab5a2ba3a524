//! WorldCat Discovery search library
//!
//! Query model, bibliographic record model, and the authenticated search
//! client for the WorldCat Discovery bibs-holdings endpoint. Builds on
//! `worldcat-auth` for bearer tokens: the client fetches a token per
//! request and, on an authorization failure, performs exactly one silent
//! refresh plus one retry before surfacing the error.

pub mod client;
pub mod error;
pub mod query;
pub mod records;

pub use client::{DISCOVERY_BASE_URL, HoldingsClient};
pub use error::{Error, Result};
pub use query::{DistanceUnit, HoldingsQuery, SearchType};
pub use records::{
    Address, BriefHolding, BriefRecord, CatalogingInfo, EXPORT_HEADERS, GeneralHoldings,
    export_rows,
};
