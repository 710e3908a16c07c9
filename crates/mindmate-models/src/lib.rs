pub mod account;
pub mod gateway;
pub mod id;
pub mod message;
