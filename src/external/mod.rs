pub mod address;
pub mod distance;
pub mod google_maps;
pub mod notification;
pub mod payment;
