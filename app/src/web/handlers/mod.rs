// src/web/handlers/mod.rs

pub mod button_handlers;
pub mod express_handlers;
pub mod session;
