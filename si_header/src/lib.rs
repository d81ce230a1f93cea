pub mod error;
pub mod header;
pub mod layout;
pub mod metadata;
