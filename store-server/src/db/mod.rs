//! Database access layer

pub mod audit;
pub mod carts;
pub mod coupons;
pub mod orders;
pub mod payments;
pub mod variants;
