pub mod domain;
pub mod error;
pub mod modes;
pub mod protocol;
