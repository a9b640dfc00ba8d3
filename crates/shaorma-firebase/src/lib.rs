pub mod database;
pub mod snapshot;

pub use database::{FirebaseConfig, FirebaseSource};
