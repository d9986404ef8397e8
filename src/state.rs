//! Shared application state handed to every handler.

use crate::auth::TokenSigner;
use crate::config::ResolvedModel;
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub model: Arc<ResolvedModel>,
    pub tokens: TokenSigner,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, model: Arc<ResolvedModel>, tokens: TokenSigner) -> Self {
        AppState {
            store,
            model,
            tokens,
        }
    }
}
