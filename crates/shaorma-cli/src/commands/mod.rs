pub mod consent;
pub mod format;
pub mod list;
pub mod lookups;
pub mod profile;
pub mod status;
pub mod sync;
