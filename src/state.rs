use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn},
    sse::SseRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub sse: SseRegistry,
    pub config: AppConfig,
}
