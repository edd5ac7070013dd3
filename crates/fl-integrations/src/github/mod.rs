pub mod cache;
pub mod client;
pub mod discussions;
pub mod endpoints;
pub mod items;
pub mod key_lock;
pub mod repos;
pub mod transport;
