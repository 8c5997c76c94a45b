use std::sync::Arc;

use crate::cache::Caches;
use crate::config::Config;
use crate::rate_limit::LoginRateLimiter;
use crate::stores::Stores;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub stores: Stores,
    pub config: Config,
    pub caches: Caches,
    pub login_limiter: LoginRateLimiter,
}
