pub mod hooks;
pub mod installer;
pub mod local_backend;
pub mod process_scanner;

pub use local_backend::LocalBackend;
