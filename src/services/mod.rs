pub mod deletion_requests;
pub mod inventories;
pub mod products;
pub mod sales;
pub mod sequence;
pub mod stock;
pub mod users;
