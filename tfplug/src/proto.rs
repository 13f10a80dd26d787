//! Protocol buffer types for Terraform Plugin Protocol 6
//!
//! Generated at build time by `tonic-build` from `proto/tfplugin6.proto`.
//!
//! ```rust,ignore
//! use tfplug::proto;
//!
//! // RPC messages are nested in snake_case modules
//! let request = proto::read_resource::Request::default();
//!
//! // DynamicValue/Diagnostic/AttributePath/Schema share names with the
//! // framework types, so keep the proto:: prefix
//! let wire_value = proto::DynamicValue::default();
//! ```

include!(concat!(env!("OUT_DIR"), "/tfplugin6.rs"));

pub use provider_server::{Provider as ProviderService, ProviderServer};
