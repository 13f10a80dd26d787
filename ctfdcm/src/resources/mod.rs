//! Resource implementations

pub mod challenge_dynamiciac;
pub mod challenge_model;
pub mod instance;
pub mod reconcile;
mod values;

pub use challenge_dynamiciac::ChallengeDynamicIaCResource;
pub use instance::InstanceResource;

use std::any::Any;
use std::sync::Arc;
use tfplug::types::Diagnostic;

use crate::CtfdcmProviderData;

/// Diagnostic for a failed CTFd call
pub(crate) fn client_error(detail: impl Into<String>) -> Diagnostic {
    Diagnostic::error("Client Error", detail)
}

pub(crate) fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

/// Extracts the provider data handed over by `configure`
pub(crate) fn provider_data_from(
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
) -> Result<CtfdcmProviderData, Diagnostic> {
    match provider_data {
        Some(data) => data
            .downcast_ref::<CtfdcmProviderData>()
            .cloned()
            .ok_or_else(|| {
                Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract CtfdcmProviderData from provider data",
                )
            }),
        None => Err(Diagnostic::error(
            "No provider data",
            "No provider data was provided to the resource",
        )),
    }
}
