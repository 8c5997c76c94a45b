pub mod analytics;
pub mod api_keys;
pub mod audit;
pub mod conversations;
pub mod events;
pub mod followups;
pub mod organizations;
pub mod profiles;
pub mod teams;
pub mod users;
