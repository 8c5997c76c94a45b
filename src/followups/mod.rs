pub mod links;
pub mod priority;
