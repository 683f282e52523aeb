pub mod client;
pub mod realtime;
pub mod rest;

#[cfg(test)]
pub(crate) mod testing;

pub use client::ChatSession;
pub use rest::RestClient;
