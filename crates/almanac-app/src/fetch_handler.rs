use salvo::async_trait;
use std::sync::Arc;

use crate::error::AppResult;
use almanac_core::error::CoreError;
use almanac_service::import::ReqwestFetcher;

/// Shares one outbound HTTP client between requests.
pub struct FetcherHandler {
    pub fetcher: Arc<ReqwestFetcher>,
}

#[async_trait]
impl salvo::Handler for FetcherHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(Arc::clone(&self.fetcher));
    }
}

/// ## Summary
/// Retrieves the outbound HTTP client from the depot.
///
/// ## Errors
/// Returns an error if no client was placed in the depot.
pub fn get_fetcher_from_depot(depot: &salvo::Depot) -> AppResult<Arc<ReqwestFetcher>> {
    depot
        .obtain::<Arc<ReqwestFetcher>>()
        .cloned()
        .map_err(|_err| CoreError::InvariantViolation("Fetcher not found in depot").into())
}
