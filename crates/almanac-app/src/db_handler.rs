use std::sync::Arc;

use salvo::async_trait;

use crate::error::{AppError, AppResult};
use almanac_db::db::DbProvider;

/// Shared handle to the calendar database.
pub type SharedDb = Arc<dyn DbProvider + Send + Sync>;

/// Places the calendar database in every request's depot.
pub struct DbProviderHandler {
    provider: SharedDb,
}

impl DbProviderHandler {
    #[must_use]
    pub fn new(provider: impl DbProvider + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }
}

#[async_trait]
impl salvo::Handler for DbProviderHandler {
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(Arc::clone(&self.provider));
    }
}

/// ## Summary
/// Retrieves the calendar database from the depot.
///
/// ## Errors
/// Returns `Unavailable` if the server was started without a database.
pub fn get_db_from_depot(depot: &salvo::Depot) -> AppResult<SharedDb> {
    depot
        .obtain::<SharedDb>()
        .cloned()
        .map_err(|_err| AppError::Unavailable("database"))
}
