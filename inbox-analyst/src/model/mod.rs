pub mod analysis;
pub mod processed_email;
