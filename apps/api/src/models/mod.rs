pub mod candidature;
pub mod profile;
