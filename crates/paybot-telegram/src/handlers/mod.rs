//! Update Handlers

mod callbacks;
mod commands;

pub use callbacks::on_callback;
pub use commands::on_message;
