use std::sync::Arc;

pub use almanac_core::config::*;
use almanac_interchange::timezone::resolve_timezone;
use almanac_service::calendar::expand::ExpandOptions;
use almanac_service::import::ImportSettings;
use salvo::async_trait;

use crate::error::{AppError, AppResult};

pub struct ConfigHandler {
    pub settings: Settings,
}

#[async_trait]
impl salvo::Handler for ConfigHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        let settings: Arc<Settings> = Arc::new(self.settings.clone());
        depot.inject(settings);
    }
}

/// ## Summary
/// Retrieves the application configuration from the depot.
///
/// ## Errors
/// Returns an error if the configuration is not found in the depot.
pub fn get_config_from_depot(depot: &salvo::Depot) -> AppResult<Arc<Settings>> {
    depot.obtain::<Arc<Settings>>().cloned().map_err(|_err| {
        AppError::CoreError(almanac_core::error::CoreError::InvariantViolation(
            "Configuration not found in depot",
        ))
    })
}

/// ## Summary
/// Expansion settings of the installation: site timezone and instance cap.
///
/// ## Errors
/// Returns an error if `events.timezone` is not a known IANA name.
pub fn expand_options(settings: &Settings) -> AppResult<ExpandOptions> {
    let timezone = resolve_timezone(&settings.events.timezone)
        .map_err(almanac_service::error::ServiceError::from)?;
    Ok(ExpandOptions::new(timezone, settings.events.max_instances))
}

/// ## Errors
/// Returns an error if `events.timezone` is not a known IANA name.
pub fn import_settings(settings: &Settings) -> AppResult<ImportSettings> {
    Ok(ImportSettings::from_settings(settings)?)
}
