//! HTTP request handlers

pub mod health;
pub mod karobar;
pub mod medicine;
pub mod password_reset;
pub mod purchase;
pub mod refund;
pub mod sales;
pub mod vendor;

pub use health::*;
pub use karobar::*;
pub use medicine::*;
pub use password_reset::*;
pub use purchase::*;
pub use refund::*;
pub use sales::*;
pub use vendor::*;
