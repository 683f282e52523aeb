pub mod app;
pub mod chat_list;
pub mod components;
pub mod render;
pub mod state;

pub use app::ChatApp;
