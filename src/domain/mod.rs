pub mod account;
pub mod index;
pub mod operation;
pub mod ports;
pub mod schema;
pub mod transfer;
