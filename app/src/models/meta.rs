// src/models/meta.rs

//! Order metadata keys. They are shared with the storefront and the proxy
//! server, so the names must not change.

pub const EXPRESS_CHECKOUT: &str = "_wpppc_express_checkout";
pub const EXPRESS_TOTALS: &str = "_express_checkout_totals";

pub const ORDER_TOTAL: &str = "_order_total";
pub const ORDER_SHIPPING: &str = "_order_shipping";
pub const ORDER_TAX: &str = "_order_tax";
pub const CART_TAX: &str = "_cart_tax";

pub const SERVER_ID: &str = "_wpppc_server_id";
pub const PAYPAL_ORDER_ID: &str = "_paypal_order_id";

pub const PAID_DATE: &str = "_paid_date";
pub const TRANSACTION_ID: &str = "_transaction_id";
pub const PAYPAL_TRANSACTION_ID: &str = "_paypal_transaction_id";
pub const PAYPAL_SELLER_PROTECTION: &str = "_paypal_seller_protection";

pub const BILLING_ADDRESS: &str = "_wpppc_billing_address";
pub const SHIPPING_ADDRESS: &str = "_wpppc_shipping_address";

/// Payment method id written on express orders.
pub const PAYMENT_METHOD: &str = "paypal_proxy";
