// src/lib.rs

//! PayPal express checkout for a storefront whose PayPal account lives behind
//! a proxy server. Three flows (create, complete, address backfill) run on the
//! `checkout_flow` engine behind an actix-web API.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod web;
