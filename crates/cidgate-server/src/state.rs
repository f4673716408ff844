use std::sync::Arc;

use cidgate_core::ContentService;

use crate::auth::CredentialTable;

/// Shared state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub service: ContentService,
    pub credentials: Arc<CredentialTable>,
}

impl AppState {
    pub fn new(service: ContentService, credentials: CredentialTable) -> Self {
        Self {
            service,
            credentials: Arc::new(credentials),
        }
    }
}
