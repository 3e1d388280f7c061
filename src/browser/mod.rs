pub mod connection;
pub mod launcher;
pub mod session;

pub use session::Session;
