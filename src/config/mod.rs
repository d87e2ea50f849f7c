use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::Recipient;

/// Top-level application configuration. Resolved once at startup and passed
/// down; nothing re-reads configuration after this point.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
}

// ── Scraper ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_category_url")]
    pub category_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

// ── Extractor ────────────────────────────────────────────────────────────────

/// Structural queries tried against the category page, most specific first.
/// The markup is unstable; these are data, not logic.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractorConfig {
    #[serde(default = "default_container_selectors")]
    pub container_selectors: Vec<String>,

    #[serde(default = "default_name_selectors")]
    pub name_selectors: Vec<String>,

    #[serde(default = "default_price_selectors")]
    pub price_selectors: Vec<String>,

    #[serde(default = "default_unit_selectors")]
    pub unit_selectors: Vec<String>,

    /// Keywords used when falling back to free-text scanning for a name.
    #[serde(default = "default_text_fallback_keywords")]
    pub text_fallback_keywords: Vec<String>,

    #[serde(default = "default_max_items_per_selector")]
    pub max_items_per_selector: usize,
}

// ── Matcher ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchProfile {
    /// Similarity threshold 0.6, favoring recall.
    Permissive,
    /// Similarity threshold 0.8, favoring precision.
    Strict,
}

impl MatchProfile {
    pub fn similarity_threshold(&self) -> f64 {
        match self {
            MatchProfile::Permissive => 0.6,
            MatchProfile::Strict => 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    Exact,
    Similarity,
    WordOverlap,
    Keywords,
}

/// A curated keyword pair: `tracked` must appear in the catalog name and
/// `candidate` in the scraped name for the pair to vote a match.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct KeywordPair {
    pub tracked: String,
    pub candidate: String,
}

impl KeywordPair {
    fn new(tracked: &str, candidate: &str) -> Self {
        Self {
            tracked: tracked.to_string(),
            candidate: candidate.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatcherConfig {
    #[serde(default = "default_profile")]
    pub profile: MatchProfile,

    /// Overrides the profile's similarity threshold when set.
    #[serde(default)]
    pub similarity_threshold: Option<f64>,

    /// Fraction of a tracked name's tokens that must overlap.
    #[serde(default = "default_word_overlap_ratio")]
    pub word_overlap_ratio: f64,

    /// Strategies tried in order; first hit wins.
    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategyKind>,

    #[serde(default = "default_brand_keywords")]
    pub brand_keywords: Vec<KeywordPair>,

    #[serde(default = "default_product_type_keywords")]
    pub product_type_keywords: Vec<KeywordPair>,
}

impl MatcherConfig {
    /// Effective similarity threshold: explicit override beats the profile.
    pub fn effective_similarity_threshold(&self) -> f64 {
        self.similarity_threshold
            .unwrap_or_else(|| self.profile.similarity_threshold())
    }
}

// ── Catalog ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Tracked product names, one string each.
    #[serde(default = "default_tracked_products")]
    pub products: Vec<String>,
}

// ── Storage ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Local JSON history file, latest record per product.
    File,
    /// Remote document store, full per-record history.
    Remote,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,

    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,

    #[serde(default = "default_export_path")]
    pub export_path: PathBuf,

    #[serde(default = "default_remote_uri")]
    pub remote_uri: String,

    #[serde(default = "default_remote_database")]
    pub remote_database: String,
}

// ── Email ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_smtp_server")]
    pub smtp_server: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub sender_email: String,

    /// Set via TRACKER__EMAIL__SENDER_PASSWORD or .env; never committed.
    #[serde(default)]
    pub sender_password: String,

    #[serde(default = "default_sender_name")]
    pub sender_name: String,
}

// ── Alerts ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlertsConfig {
    #[serde(default = "default_max_alerts_per_day")]
    pub max_alerts_per_day: usize,

    #[serde(default = "default_cooldown_hours")]
    pub cooldown_hours: i64,

    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,

    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,

    #[serde(default = "default_true")]
    pub include_product_link: bool,

    #[serde(default)]
    pub recipients: Vec<Recipient>,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_category_url() -> String {
    "https://www.sayweee.com/en/category/sale".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_request_delay_ms() -> u64 {
    1000
}
fn default_jitter_ms() -> u64 {
    500
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1500
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}

fn default_max_items_per_selector() -> usize {
    30
}

fn default_profile() -> MatchProfile {
    MatchProfile::Permissive
}
fn default_word_overlap_ratio() -> f64 {
    0.4
}
fn default_strategies() -> Vec<StrategyKind> {
    vec![
        StrategyKind::Exact,
        StrategyKind::Similarity,
        StrategyKind::WordOverlap,
        StrategyKind::Keywords,
    ]
}

fn default_backend() -> StorageBackend {
    StorageBackend::File
}
fn default_history_path() -> PathBuf {
    PathBuf::from("data/processed/price_history.json")
}
fn default_export_path() -> PathBuf {
    PathBuf::from("data/processed/grocery_prices.csv")
}
fn default_remote_uri() -> String {
    "mongodb://localhost:27017".to_string()
}
fn default_remote_database() -> String {
    "price_tracker".to_string()
}

fn default_smtp_server() -> String {
    "smtp.gmail.com".to_string()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_sender_name() -> String {
    "Grocery Price Tracker".to_string()
}

fn default_max_alerts_per_day() -> usize {
    5
}
fn default_cooldown_hours() -> i64 {
    6
}
fn default_ledger_path() -> PathBuf {
    PathBuf::from("data/processed/alert_history.json")
}
fn default_subject_prefix() -> String {
    "Price Drop Alert: ".to_string()
}
fn default_true() -> bool {
    true
}

// Structural selectors for the category page, most specific first.
const DEFAULT_CONTAINER_SELECTORS: &[&str] = &[
    r#"div[data-testid="wid-product-card-container"]"#,
    r#"[data-testid*="product"]"#,
    ".product-card",
    ".product-item",
    "article",
    r#"[class*="product"]"#,
    r#"[class*="Product"]"#,
    r#"div[class*="card"]"#,
    r#"a[href*="/product/"]"#,
    r#"div[class*="item"]"#,
];

const DEFAULT_NAME_SELECTORS: &[&str] = &[
    r#"div[data-role="product-name"]"#,
    r#"[data-testid*="name"]"#,
    r#"[data-testid*="title"]"#,
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    ".product-name",
    ".title",
    ".name",
    r#"a[href*="/product/"]"#,
    r#"span[class*="name"]"#,
    r#"span[class*="title"]"#,
    r#"div[class*="name"]"#,
    r#"div[class*="title"]"#,
    r#"p[class*="name"]"#,
    r#"p[class*="title"]"#,
];

const DEFAULT_PRICE_SELECTORS: &[&str] = &[
    r#"div[data-testid="wid-product-card-price"]"#,
    r#"[data-testid*="price"]"#,
    ".price",
    r#"[class*="price"]"#,
    r#"[class*="Price"]"#,
    r#"span[class*="price"]"#,
    r#"div[class*="price"]"#,
    r#"p[class*="price"]"#,
];

const DEFAULT_UNIT_SELECTORS: &[&str] = &[
    r#"div[data-role="product-unit-price"]"#,
    r#"[data-testid*="unit"]"#,
    ".unit-price",
    ".unit",
];

const DEFAULT_TEXT_FALLBACK_KEYWORDS: &[&str] = &[
    "noodles",
    "sauce",
    "soy",
    "maggi",
    "lee kum",
    "barramundi",
    "fish",
];

fn default_container_selectors() -> Vec<String> {
    DEFAULT_CONTAINER_SELECTORS.iter().map(|s| s.to_string()).collect()
}
fn default_name_selectors() -> Vec<String> {
    DEFAULT_NAME_SELECTORS.iter().map(|s| s.to_string()).collect()
}
fn default_price_selectors() -> Vec<String> {
    DEFAULT_PRICE_SELECTORS.iter().map(|s| s.to_string()).collect()
}
fn default_unit_selectors() -> Vec<String> {
    DEFAULT_UNIT_SELECTORS.iter().map(|s| s.to_string()).collect()
}
fn default_text_fallback_keywords() -> Vec<String> {
    DEFAULT_TEXT_FALLBACK_KEYWORDS.iter().map(|s| s.to_string()).collect()
}

// Default catalog: Indian grocery staples from the tracked storefront.
const DEFAULT_TRACKED_PRODUCTS: &[&str] = &[
    // Fresh vegetables
    "Indian Eggplant 2 lb",
    "Indian Bitter Melon 2 lb",
    "Indian okra 0.9-1.1 lb",
    "Red onions 2 lb bag",
    "Roma tomatoes 2 lb bag",
    "Fresh ginger 0.95-1.05 lb",
    "Green onion 1 bunch",
    "Cauliflower 1 head",
    "Spinach 1 bunch",
    "Sleeved garlic pack 5 ct",
    "Green cabbage 1 head",
    "Yellow onion 3 lb bag",
    "Persian cucumbers 0.9-1.1 lb",
    "Idaho russet potatoes 5 lb",
    "Green bell pepper",
    "Opo squash 1 pc",
    "Green beans 0.9-1.1 lb",
    "Carrots 2 lb bag",
    // Fresh herbs
    "Cilantro 1 bunch",
    "Curry leaves 0.25 oz",
    "Mint 1 bunch",
    // Fruit
    "Bananas 2.6-3 lb",
    // Chilies
    "Mini spicy green chilies 226 g bag",
    // Instant noodles
    "Maggi Masala instant noodles 9.8 oz",
    // Frozen
    "Deep Paneer Paratha Frozen 4 pcs 13 oz",
    "Deep Bhagwati's Methi Thepla 9 oz",
    "Deep ClayOven Tandoori Naan Family Pack 42.4 oz",
    "Deep Family Pack Homestyle Paratha 20 pcs 46 oz",
    "Franco uncooked phulka 18 pcs 1.31 lb",
    // Rice
    "Laxmi Poha Flattened Rice Thick 4 lb",
    "Shastha Dosa Batter 32 oz",
    "India Gate Basmati Rice",
    "Laxmi Idli Rice 20 lb",
    "Regal Sona Masoori Rice 20 lb",
    "Laxmi Ponni Boiled Rice 20 lb",
    // Flour
    "Aashirvaad Whole Wheat Atta Flour 20 lb",
    "Laxmi Besan gram flour 2 lb",
    // Pulses
    "Laxmi Toor Dal Split Pigeon Peas 4 lb",
    "Laxmi Moong Dal Skinned mung beans 4 lb",
    "Laxmi Yellow Split Peas 4 lb",
    "Laxmi Urad Dal Split 4 lb",
    "Laxmi Chana Dal 4 lb",
    "Laxmi Kabuli Chana chickpeas 4 lb",
    "Laxmi Kala Chana black chickpeas 4 lb",
    "Laxmi Urad Gota black whole lentil 4 lb",
    "Laxmi Sabudana tapioca 4 lb",
    // Dairy
    "Vadilal Paneer Block",
    "Nanak Plain Paneer 400 g",
    "Pavel's whole-milk yogurt 32 oz",
    "Amul Ghee clarified butter",
    // Snacks
    "Garvi Gujarat Gujarati Chakri 10 oz",
    "Kurkure Masala Munch chips",
    "Kurkure Chilli Chatka chips",
    "Lay's Magic Masala chips 1.82 oz",
    "Laxmi Puffed Rice 14 oz",
    // Condiments
    "Ching's Schezwan chutney",
    "Lee Kum Kee Supreme Soy Sauce 500 ml",
    // Spices
    "Aara Cumin Seeds",
    // Fish
    "TSF Barramundi Whole Cleaned 500-550 g",
];

fn default_tracked_products() -> Vec<String> {
    DEFAULT_TRACKED_PRODUCTS.iter().map(|s| s.to_string()).collect()
}

const DEFAULT_BRAND_KEYWORDS: &[(&str, &str)] = &[
    ("maggi", "maggi"),
    ("lee kum", "lee kum"),
    ("soy sauce", "soy"),
    ("noodles", "noodles"),
    ("barramundi", "barramundi"),
    ("tsf", "tsf"),
    ("laxmi", "laxmi"),
    ("deep", "deep"),
    ("aashirvaad", "aashirvaad"),
    ("india gate", "india gate"),
    ("regal", "regal"),
    ("pavel", "pavel"),
    ("amul", "amul"),
    ("vadilal", "vadilal"),
    ("nanak", "nanak"),
    ("garvi gujarat", "garvi"),
    ("kurkure", "kurkure"),
    ("lay", "lay"),
    ("ching", "ching"),
    ("aara", "aara"),
    ("shastha", "shastha"),
    ("franco", "franco"),
];

const DEFAULT_PRODUCT_TYPE_KEYWORDS: &[(&str, &str)] = &[
    ("paneer", "paneer"),
    ("ghee", "ghee"),
    ("yogurt", "yogurt"),
    ("rice", "rice"),
    ("flour", "flour"),
    ("atta", "atta"),
    ("besan", "besan"),
    ("dal", "dal"),
    ("chana", "chana"),
    ("urad", "urad"),
    ("moong", "moong"),
    ("toor", "toor"),
    ("sabudana", "sabudana"),
    ("poha", "poha"),
    ("paratha", "paratha"),
    ("naan", "naan"),
    ("thepla", "thepla"),
    ("phulka", "phulka"),
    ("dosa", "dosa"),
    ("idli", "idli"),
    ("chakri", "chakri"),
    ("chips", "chips"),
    ("cumin", "cumin"),
    ("eggplant", "eggplant"),
    ("okra", "okra"),
    ("onion", "onion"),
    ("tomato", "tomato"),
    ("ginger", "ginger"),
    ("garlic", "garlic"),
    ("cabbage", "cabbage"),
    ("cucumber", "cucumber"),
    ("potato", "potato"),
    ("bell pepper", "pepper"),
    ("squash", "squash"),
    ("beans", "beans"),
    ("carrot", "carrot"),
    ("cilantro", "cilantro"),
    ("curry leaves", "curry"),
    ("mint", "mint"),
    ("banana", "banana"),
    ("chilies", "chili"),
    ("chilli", "chili"),
];

fn default_brand_keywords() -> Vec<KeywordPair> {
    DEFAULT_BRAND_KEYWORDS
        .iter()
        .map(|(t, c)| KeywordPair::new(t, c))
        .collect()
}
fn default_product_type_keywords() -> Vec<KeywordPair> {
    DEFAULT_PRODUCT_TYPE_KEYWORDS
        .iter()
        .map(|(t, c)| KeywordPair::new(t, c))
        .collect()
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("TRACKER").separator("__"))
            .build()?;

        let app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|_| AppConfig::default());
        Ok(app_cfg)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig::default(),
            extractor: ExtractorConfig::default(),
            matcher: MatcherConfig::default(),
            catalog: CatalogConfig::default(),
            storage: StorageConfig::default(),
            email: EmailConfig::default(),
            alerts: AlertsConfig::default(),
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            category_url: default_category_url(),
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            jitter_ms: default_jitter_ms(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            container_selectors: default_container_selectors(),
            name_selectors: default_name_selectors(),
            price_selectors: default_price_selectors(),
            unit_selectors: default_unit_selectors(),
            text_fallback_keywords: default_text_fallback_keywords(),
            max_items_per_selector: default_max_items_per_selector(),
        }
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            similarity_threshold: None,
            word_overlap_ratio: default_word_overlap_ratio(),
            strategies: default_strategies(),
            brand_keywords: default_brand_keywords(),
            product_type_keywords: default_product_type_keywords(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            products: default_tracked_products(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            history_path: default_history_path(),
            export_path: default_export_path(),
            remote_uri: default_remote_uri(),
            remote_database: default_remote_database(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: default_smtp_server(),
            smtp_port: default_smtp_port(),
            sender_email: String::new(),
            sender_password: String::new(),
            sender_name: default_sender_name(),
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            max_alerts_per_day: default_max_alerts_per_day(),
            cooldown_hours: default_cooldown_hours(),
            ledger_path: default_ledger_path(),
            subject_prefix: default_subject_prefix(),
            include_product_link: default_true(),
            recipients: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_thresholds() {
        assert_eq!(MatchProfile::Permissive.similarity_threshold(), 0.6);
        assert_eq!(MatchProfile::Strict.similarity_threshold(), 0.8);

        let mut cfg = MatcherConfig::default();
        assert_eq!(cfg.effective_similarity_threshold(), 0.6);
        cfg.profile = MatchProfile::Strict;
        assert_eq!(cfg.effective_similarity_threshold(), 0.8);
        cfg.similarity_threshold = Some(0.75);
        assert_eq!(cfg.effective_similarity_threshold(), 0.75);
    }

    #[test]
    fn default_catalog_is_nonempty() {
        let cfg = CatalogConfig::default();
        assert!(cfg.products.len() > 50);
        assert!(cfg.products.iter().any(|p| p.contains("Maggi")));
    }
}
