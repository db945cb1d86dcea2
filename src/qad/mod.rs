//! Inventory backend client: authentication, domains and inventory browse

mod client;
mod models;

pub use client::QadClient;
pub use models::{pick_default_domain, AuthoritativeRecord, Domain};
