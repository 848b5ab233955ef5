pub mod addresses;
pub mod bookings;
pub mod catalog;
pub mod credit_accounts;
pub mod quotes;
