use crate::config::Config;
use crate::services::Academics;
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub academics: Academics,
    pub config: Config,
}

impl FromRef<AppState> for Academics {
    fn from_ref(state: &AppState) -> Self {
        state.academics.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
