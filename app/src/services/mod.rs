// src/services/mod.rs

//! Collaborators the checkout flows call out to: storage, the proxy server,
//! request signing and the storefront-facing helpers.

pub mod button;
pub mod csrf;
pub mod product_mapping;
pub mod proxy_client;
pub mod signing;
pub mod stores;
