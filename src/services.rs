pub mod eligibility;
pub mod finish;
pub mod geography;
pub mod interest;
pub mod matching;
pub mod notifications;
pub mod partition;
pub mod project_service;
pub mod requests;
pub mod triggers;
