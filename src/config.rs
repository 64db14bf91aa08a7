use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Default values for configuration
const CONFIG_DIR: &str = "config";
const DEFAULT_FORECAST_HORIZON_DAYS: u32 = 7;
const DEFAULT_TRAINING_LOOKBACK_DAYS: i64 = 90;
const DEFAULT_RECENT_LOOKBACK_DAYS: i64 = 30;
const DEFAULT_MIN_TRAINING_ROWS: usize = 10;
const DEFAULT_BASE_DAILY_AMOUNT: f64 = 1000.0;
const DEFAULT_TREE_COUNT: usize = 100;
const DEFAULT_MODEL_SEED: u64 = 42;
const DEFAULT_INVENTORY_LOOKBACK_DAYS: i64 = 60;
const DEFAULT_LEAD_TIME_DAYS: u32 = 7;
const DEFAULT_ORDERING_COST: f64 = 100.0;
const DEFAULT_HOLDING_COST_RATE: f64 = 0.2;
const DEFAULT_PRICING_LOOKBACK_DAYS: i64 = 60;
const DEFAULT_SEGMENTATION_LOOKBACK_DAYS: i64 = 90;
const DEFAULT_CLUSTER_COUNT: usize = 3;
const DEFAULT_ANALYZER_BUDGET_SECS: u64 = 10;

/// Demand forecasting configuration
#[derive(Clone, Debug, Deserialize)]
pub struct ForecastConfig {
    /// Number of future days predicted per run
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,

    /// Lookback window for model training, in days
    #[serde(default = "default_training_lookback")]
    pub training_lookback_days: i64,

    /// Lookback window for the recent-sales series feeding lag features,
    /// the statistical fallback, and confidence scoring
    #[serde(default = "default_recent_lookback")]
    pub recent_lookback_days: i64,

    /// Minimum complete feature rows required before the learned path is
    /// attempted at all
    #[serde(default = "default_min_training_rows")]
    pub min_training_rows: usize,

    /// Daily amount assumed by the fallback when a shop has no history
    #[serde(default = "default_base_daily_amount")]
    pub default_daily_amount: f64,

    /// Fallback multiplier applied on Friday, Saturday, and Sunday
    #[serde(default = "default_weekend_multiplier")]
    pub weekend_multiplier: f64,

    /// Fallback multiplier applied Monday through Thursday
    #[serde(default = "default_weekday_multiplier")]
    pub weekday_multiplier: f64,

    /// Trees in the bagged regression ensemble
    #[serde(default = "default_tree_count")]
    pub tree_count: usize,

    /// Seed for bootstrap sampling and feature subsampling
    #[serde(default = "default_model_seed")]
    pub seed: u64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            training_lookback_days: default_training_lookback(),
            recent_lookback_days: default_recent_lookback(),
            min_training_rows: default_min_training_rows(),
            default_daily_amount: default_base_daily_amount(),
            weekend_multiplier: default_weekend_multiplier(),
            weekday_multiplier: default_weekday_multiplier(),
            tree_count: default_tree_count(),
            seed: default_model_seed(),
        }
    }
}

/// Inventory optimization configuration
#[derive(Clone, Debug, Deserialize)]
pub struct InventoryConfig {
    /// Lookback window for per-product sales velocity, in days
    #[serde(default = "default_inventory_lookback")]
    pub lookback_days: i64,

    /// Days between placing an order and receiving stock
    #[serde(default = "default_lead_time")]
    pub lead_time_days: u32,

    /// Fixed cost of placing one order, in currency units
    #[serde(default = "default_ordering_cost")]
    pub ordering_cost: f64,

    /// Annual holding cost as a fraction of unit cost
    #[serde(default = "default_holding_cost_rate")]
    pub holding_cost_rate: f64,

    /// Minimum distinct sale days before the statistical path is used
    #[serde(default = "default_min_history_days")]
    pub min_history_days: usize,

    /// Stockout forecasts returned per shop, soonest first
    #[serde(default = "default_stockout_limit")]
    pub stockout_limit: usize,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_inventory_lookback(),
            lead_time_days: default_lead_time(),
            ordering_cost: default_ordering_cost(),
            holding_cost_rate: default_holding_cost_rate(),
            min_history_days: default_min_history_days(),
            stockout_limit: default_stockout_limit(),
        }
    }
}

/// Price elasticity configuration
#[derive(Clone, Debug, Deserialize)]
pub struct PricingConfig {
    /// Lookback window for observed (price, quantity) pairs, in days
    #[serde(default = "default_pricing_lookback")]
    pub lookback_days: i64,

    /// Minimum sale line items before a regression is attempted
    #[serde(default = "default_min_line_items")]
    pub min_line_items: usize,

    /// Minimum distinct unit prices before a regression is attempted
    #[serde(default = "default_min_price_points")]
    pub min_price_points: usize,

    /// Recommended price never drops below cost multiplied by this factor
    #[serde(default = "default_min_margin_factor")]
    pub min_margin_factor: f64,

    /// Products analyzed per shop-level recommendation run
    #[serde(default = "default_products_per_run")]
    pub products_per_run: usize,

    /// Recommendations surfaced per shop-level run
    #[serde(default = "default_recommendation_limit")]
    pub recommendation_limit: usize,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_pricing_lookback(),
            min_line_items: default_min_line_items(),
            min_price_points: default_min_price_points(),
            min_margin_factor: default_min_margin_factor(),
            products_per_run: default_products_per_run(),
            recommendation_limit: default_recommendation_limit(),
        }
    }
}

/// Customer segmentation configuration
#[derive(Clone, Debug, Deserialize)]
pub struct SegmentationConfig {
    /// Lookback window for RFM metrics, in days
    #[serde(default = "default_segmentation_lookback")]
    pub lookback_days: i64,

    /// Number of clusters; labeling assumes 3
    #[serde(default = "default_cluster_count")]
    pub cluster_count: usize,

    /// Fixed seed so segment assignment is reproducible across runs
    #[serde(default = "default_model_seed")]
    pub seed: u64,

    /// Iteration cap for centroid refinement
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_segmentation_lookback(),
            cluster_count: default_cluster_count(),
            seed: default_model_seed(),
            max_iterations: default_max_iterations(),
        }
    }
}

/// Insight aggregation configuration
#[derive(Clone, Debug, Deserialize)]
pub struct InsightConfig {
    /// Growth/decline alert threshold versus the 30-day baseline, percent
    #[serde(default = "default_growth_threshold")]
    pub growth_threshold_pct: f64,

    /// Product names surfaced inside one aggregated message
    #[serde(default = "default_names_per_message")]
    pub names_per_message: usize,

    /// Insights kept per kind after ranking
    #[serde(default = "default_max_per_kind")]
    pub max_per_kind: usize,

    /// Wall-clock budget per analyzer before degrading to its default path
    #[serde(default = "default_analyzer_budget_secs")]
    pub analyzer_budget_secs: u64,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            growth_threshold_pct: default_growth_threshold(),
            names_per_message: default_names_per_message(),
            max_per_kind: default_max_per_kind(),
            analyzer_budget_secs: default_analyzer_budget_secs(),
        }
    }
}

/// Engine configuration
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub forecast: ForecastConfig,

    #[serde(default)]
    pub inventory: InventoryConfig,

    #[serde(default)]
    pub pricing: PricingConfig,

    #[serde(default)]
    pub segmentation: SegmentationConfig,

    #[serde(default)]
    pub insights: InsightConfig,
}

impl EngineConfig {
    /// Load configuration from `config/engine.toml` (optional) with
    /// `SHOPLYTICS_`-prefixed environment overrides, e.g.
    /// `SHOPLYTICS_FORECAST__HORIZON_DAYS=14`.
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(&format!("{}/engine", CONFIG_DIR)).required(false))
            .add_source(Environment::with_prefix("SHOPLYTICS").separator("__"))
            .build()?
            .try_deserialize()
    }
}

/// Initializes tracing using the provided log level as the default
/// filter, honoring `RUST_LOG` when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("shoplytics={}", level);
    let filter_directive = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

fn default_horizon_days() -> u32 {
    DEFAULT_FORECAST_HORIZON_DAYS
}

fn default_training_lookback() -> i64 {
    DEFAULT_TRAINING_LOOKBACK_DAYS
}

fn default_recent_lookback() -> i64 {
    DEFAULT_RECENT_LOOKBACK_DAYS
}

fn default_min_training_rows() -> usize {
    DEFAULT_MIN_TRAINING_ROWS
}

fn default_base_daily_amount() -> f64 {
    DEFAULT_BASE_DAILY_AMOUNT
}

fn default_weekend_multiplier() -> f64 {
    1.2
}

fn default_weekday_multiplier() -> f64 {
    0.9
}

fn default_tree_count() -> usize {
    DEFAULT_TREE_COUNT
}

fn default_model_seed() -> u64 {
    DEFAULT_MODEL_SEED
}

fn default_inventory_lookback() -> i64 {
    DEFAULT_INVENTORY_LOOKBACK_DAYS
}

fn default_lead_time() -> u32 {
    DEFAULT_LEAD_TIME_DAYS
}

fn default_ordering_cost() -> f64 {
    DEFAULT_ORDERING_COST
}

fn default_holding_cost_rate() -> f64 {
    DEFAULT_HOLDING_COST_RATE
}

fn default_min_history_days() -> usize {
    7
}

fn default_stockout_limit() -> usize {
    5
}

fn default_pricing_lookback() -> i64 {
    DEFAULT_PRICING_LOOKBACK_DAYS
}

fn default_min_line_items() -> usize {
    5
}

fn default_min_price_points() -> usize {
    2
}

fn default_min_margin_factor() -> f64 {
    1.2
}

fn default_products_per_run() -> usize {
    10
}

fn default_recommendation_limit() -> usize {
    5
}

fn default_segmentation_lookback() -> i64 {
    DEFAULT_SEGMENTATION_LOOKBACK_DAYS
}

fn default_cluster_count() -> usize {
    DEFAULT_CLUSTER_COUNT
}

fn default_max_iterations() -> usize {
    100
}

fn default_growth_threshold() -> f64 {
    10.0
}

fn default_names_per_message() -> usize {
    3
}

fn default_max_per_kind() -> usize {
    3
}

fn default_analyzer_budget_secs() -> u64 {
    DEFAULT_ANALYZER_BUDGET_SECS
}
