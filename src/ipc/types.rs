use crate::cache::QueryCache;
use crate::config::Config;
use crate::debounce::Debouncer;
use crate::draft::QuestionDraft;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    pub cache: QueryCache,
    pub drafts: HashMap<String, QuestionDraft>,
    pub searches: HashMap<String, Debouncer>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        AppState {
            config,
            cache: QueryCache::new(),
            drafts: HashMap::new(),
            searches: HashMap::new(),
        }
    }
}
