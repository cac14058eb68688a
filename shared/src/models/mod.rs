//! Domain models for the Pharmacy POS engine

mod karobar;
mod medicine;
mod purchase;
mod refund;
mod sale;
mod stock;
mod supplier;
mod user;

pub use karobar::*;
pub use medicine::*;
pub use purchase::*;
pub use refund::*;
pub use sale::*;
pub use stock::*;
pub use supplier::*;
pub use user::*;
