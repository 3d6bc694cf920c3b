//! Task marketplace API: client, payload types and account stores.

pub mod api_types;
pub mod client;
pub mod stores;
pub mod types;

pub use client::MarketClient;
pub use stores::MarketStores;
