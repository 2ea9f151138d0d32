// src/models/mod.rs

//! Storefront records the checkout flows read and mutate.

pub mod address;
pub mod cart;
pub mod meta;
pub mod order;
pub mod payloads;
pub mod paypal;
pub mod server;

pub use address::{Address, AddressKind};
pub use cart::{CartCoupon, CartFee, CartItem, CartSnapshot, CheckoutTotals, Customer, ProductSummary, ShippingPackage, ShippingRate};
pub use order::{CouponLine, FeeLine, Order, OrderNote, OrderStatus, ProductLine, ShippingLine, TaxLine};
pub use server::ProxyServer;
