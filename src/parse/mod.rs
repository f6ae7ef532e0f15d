pub mod rules;
pub mod sfc;
pub mod source;
