// Analyzers
pub mod customers;
pub mod forecasting;
pub mod inventory;
pub mod pricing;

// Read-side rollups feeding the rule checks
pub mod analytics;

// Aggregation and persistence of insights
pub mod insights;
