use crate::conversion::ConversionTable;
use crate::error::{CommodityPriceError, Result};
use crate::month_key::{current_year, MonthKeyParser};
use crate::schema::{CommodityId, WheatVariant};
use crate::window::RecencyWindow;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_YEARS_BACK: u32 = 5;
pub const MAX_YEARS_BACK: u32 = 100;
pub const DEFAULT_SYNTHETIC_NOISE: f64 = 0.05;
/// Month keys carry four-digit years and the window reaches one year ahead.
pub const MAX_REFERENCE_YEAR: i32 = 9998;

fn default_years_back() -> u32 {
    DEFAULT_YEARS_BACK
}

fn default_noise() -> f64 {
    DEFAULT_SYNTHETIC_NOISE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PipelineConfig {
    #[serde(default = "default_commodity")]
    #[schemars(description = "Commodity to process; selects the conversion pipeline and unit label")]
    pub commodity: CommodityId,

    #[serde(default = "default_years_back")]
    #[schemars(
        description = "Oldest accepted year, counted back from the current year. Records older than this are ignored."
    )]
    pub max_years_back: u32,

    #[serde(default)]
    #[schemars(description = "Wheat grade. Ignored for other commodities.")]
    pub wheat_variant: WheatVariant,

    #[serde(default)]
    #[schemars(
        description = "Calendar year treated as 'now'. Defaults to the local clock; set it for reproducible runs."
    )]
    pub reference_year: Option<i32>,

    #[serde(default = "default_noise")]
    #[schemars(
        description = "Relative standard deviation of placeholder quotes when the vendor is unavailable. Range 0.0 to 1.0."
    )]
    pub synthetic_noise_factor: f64,

    #[serde(default)]
    #[schemars(description = "Seed for placeholder quotes. Unset means a fresh random draw per run.")]
    pub synthetic_seed: Option<u64>,

    #[serde(default)]
    pub conversions: ConversionTable,
}

fn default_commodity() -> CommodityId {
    CommodityId::Wheat
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::for_commodity(default_commodity())
    }
}

impl PipelineConfig {
    pub fn for_commodity(commodity: CommodityId) -> Self {
        Self {
            commodity,
            max_years_back: DEFAULT_YEARS_BACK,
            wheat_variant: WheatVariant::default(),
            reference_year: None,
            synthetic_noise_factor: DEFAULT_SYNTHETIC_NOISE,
            synthetic_seed: None,
            conversions: ConversionTable::builtin(),
        }
    }

    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = Some(year);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn current_year(&self) -> i32 {
        self.reference_year.unwrap_or_else(current_year)
    }

    pub fn recency_window(&self) -> RecencyWindow {
        RecencyWindow::years_back(self.current_year(), self.max_years_back)
    }

    pub fn month_key_parser(&self) -> MonthKeyParser {
        MonthKeyParser::new(self.current_year())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_years_back > MAX_YEARS_BACK {
            return Err(CommodityPriceError::InvalidYearWindow(format!(
                "max_years_back {} exceeds {}",
                self.max_years_back, MAX_YEARS_BACK
            )));
        }

        if let Some(year) = self.reference_year {
            if !(0..=MAX_REFERENCE_YEAR).contains(&year) {
                return Err(CommodityPriceError::InvalidYearWindow(format!(
                    "reference_year {} is outside 0..={}",
                    year, MAX_REFERENCE_YEAR
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.synthetic_noise_factor) {
            return Err(CommodityPriceError::InvalidNoiseFactor(
                self.synthetic_noise_factor,
            ));
        }

        self.conversions.resolve(self.commodity, self.wheat_variant)?;
        self.conversions.validate()
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(PipelineConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
