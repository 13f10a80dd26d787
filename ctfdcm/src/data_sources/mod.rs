//! Data source implementations

pub mod challenges_dynamiciac;

pub use challenges_dynamiciac::ChallengesDynamicIaCDataSource;
