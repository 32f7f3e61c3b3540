pub mod basics;
pub mod carrier;
pub mod profile;
