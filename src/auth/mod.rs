pub mod admin_backend;
pub mod chatbase;
pub mod extractor;
pub mod jwt;
pub mod password;
pub mod policy;
