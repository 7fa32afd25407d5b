use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

use crate::{
    ClientSettings,
    error::RequestError,
    model::{PredictionInput, PredictionResult},
};

pub mod http;

pub use http::HttpPredictionService;

/// Remote producer of maximum-temperature estimates.
///
/// Implementations must convert every failure into a [`RequestError`]; nothing
/// is allowed to escape as a panic or an untyped error.
#[async_trait]
pub trait PredictionService: Send + Sync + Debug {
    async fn predict(&self, input: &PredictionInput) -> Result<PredictionResult, RequestError>;
}

/// Construct the HTTP service from resolved settings.
pub fn service_from_settings(settings: &ClientSettings) -> anyhow::Result<Arc<dyn PredictionService>> {
    let service: Arc<dyn PredictionService> = Arc::new(HttpPredictionService::new(settings)?);
    Ok(service)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_from_default_settings() {
        let service = service_from_settings(&ClientSettings::default());
        assert!(service.is_ok());
    }
}
