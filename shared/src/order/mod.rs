//! Order domain types shared between server and clients

pub mod status;

pub use status::{OrderStatus, ParseStatusError, PaymentMethod, PaymentStatus};
