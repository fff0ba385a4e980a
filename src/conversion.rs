use crate::error::{CommodityPriceError, Result};
use crate::schema::{CommodityId, Currency, SourceKind, WheatVariant};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const KG_PER_TONNE: f64 = 1000.0;
pub const KG_PER_POUND: f64 = 0.453_592_37;
pub const KG_PER_WHEAT_BUSHEL: f64 = 27.2155;
pub const KG_PER_PALM_OIL_CAN: f64 = 22.75;
pub const KG_PER_CRUDE_PALM_BARREL: f64 = 136.0;
pub const KG_PER_SUGAR_BAG: f64 = 50.0;
pub const KG_PER_ALUMINUM_CAN: f64 = 0.0145;

pub const MAX_DECIMALS: u32 = 8;

/// Fixed exchange rates applied to every data point regardless of its date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExchangeRates {
    #[schemars(description = "US dollars received for one Ghanaian cedi")]
    pub ghs_to_usd: f64,

    #[schemars(description = "Nigerian naira received for one US dollar")]
    pub usd_to_ngn: f64,
}

impl Default for ExchangeRates {
    fn default() -> Self {
        Self {
            ghs_to_usd: 0.087,
            usd_to_ngn: 1650.0,
        }
    }
}

impl ExchangeRates {
    pub fn to_usd(&self, amount: f64, currency: Currency) -> f64 {
        match currency {
            Currency::Usd => amount,
            Currency::Ghs => amount * self.ghs_to_usd,
            Currency::Ngn => amount / self.usd_to_ngn,
        }
    }

    pub fn from_usd(&self, amount: f64, currency: Currency) -> f64 {
        match currency {
            Currency::Usd => amount,
            Currency::Ghs => amount / self.ghs_to_usd,
            Currency::Ngn => amount * self.usd_to_ngn,
        }
    }

    pub fn convert(&self, amount: f64, from: Currency, to: Currency) -> f64 {
        if from == to {
            return amount;
        }
        self.from_usd(self.to_usd(amount, from), to)
    }
}

/// The quantity a raw price is quoted against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum QuantityBasis {
    Kilogram,
    Tonne,
    Pound,
    Bushel { kilograms: f64 },
    Barrel { kilograms: f64 },
    #[schemars(description = "A discrete item such as a can or bag with a fixed mass")]
    Item { kilograms: f64 },
}

impl QuantityBasis {
    pub fn kilograms(&self) -> f64 {
        match self {
            QuantityBasis::Kilogram => 1.0,
            QuantityBasis::Tonne => KG_PER_TONNE,
            QuantityBasis::Pound => KG_PER_POUND,
            QuantityBasis::Bushel { kilograms }
            | QuantityBasis::Barrel { kilograms }
            | QuantityBasis::Item { kilograms } => *kilograms,
        }
    }
}

fn unit_factor() -> f64 {
    1.0
}

/// How raw values from one side are turned into the commodity's common unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SideConversion {
    #[schemars(description = "Currency assumed when a raw value does not name one")]
    pub currency: Currency,

    #[serde(default = "unit_factor")]
    #[schemars(description = "Multiplier into whole currency units, e.g. 0.01 for cents")]
    pub price_scale: f64,

    pub quantity: QuantityBasis,

    #[serde(default = "unit_factor")]
    #[schemars(
        description = "Markup applied after conversion to approximate a delivered price. 1.0 means none."
    )]
    pub basis_adjustment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "per", rename_all = "snake_case")]
pub enum CommonUnit {
    Kilogram,
    Item { kilograms: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayFormat {
    pub unit_label: String,
    pub decimals: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConversionPipeline {
    #[schemars(description = "Currency of the common unit")]
    pub currency: Currency,
    pub unit: CommonUnit,
    pub unit_label: String,
    #[schemars(description = "Decimal places kept on monthly averages")]
    pub decimals: u32,
    pub ledger: SideConversion,
    pub market: SideConversion,
    #[schemars(
        description = "Typical market quote in vendor units, used only to generate placeholder data"
    )]
    pub synthetic_reference: f64,
}

impl ConversionPipeline {
    pub fn side(&self, source: SourceKind) -> &SideConversion {
        match source {
            SourceKind::Ledger => &self.ledger,
            SourceKind::Market => &self.market,
        }
    }

    /// Converts a raw price into the common unit. Missing or non-finite input
    /// yields `None`.
    pub fn to_common_unit(
        &self,
        rates: &ExchangeRates,
        raw: Option<f64>,
        source: SourceKind,
        currency: Option<Currency>,
    ) -> Option<f64> {
        let raw = raw.filter(|v| v.is_finite())?;
        let side = self.side(source);
        let currency = currency.unwrap_or(side.currency);

        let per_kg = raw * side.price_scale / side.quantity.kilograms();
        let adjusted = rates.convert(per_kg, currency, self.currency) * side.basis_adjustment;
        let value = match self.unit {
            CommonUnit::Kilogram => adjusted,
            CommonUnit::Item { kilograms } => adjusted * kilograms,
        };

        Some(value).filter(|v| v.is_finite())
    }

    /// Inverse of [`Self::to_common_unit`].
    pub fn from_common_unit(
        &self,
        rates: &ExchangeRates,
        value: Option<f64>,
        source: SourceKind,
        currency: Option<Currency>,
    ) -> Option<f64> {
        let value = value.filter(|v| v.is_finite())?;
        let side = self.side(source);
        let currency = currency.unwrap_or(side.currency);

        let adjusted = match self.unit {
            CommonUnit::Kilogram => value,
            CommonUnit::Item { kilograms } => value / kilograms,
        };
        let per_kg = rates.convert(adjusted / side.basis_adjustment, self.currency, currency);
        let raw = per_kg * side.quantity.kilograms() / side.price_scale;

        Some(raw).filter(|v| v.is_finite())
    }

    pub fn display_format(&self) -> DisplayFormat {
        DisplayFormat {
            unit_label: self.unit_label.clone(),
            decimals: self.decimals,
        }
    }

    fn validate(&self, commodity: CommodityId) -> Result<()> {
        let invalid = |details: String| CommodityPriceError::ValidationError {
            commodity,
            details,
        };

        if self.unit_label.trim().is_empty() {
            return Err(invalid("unit label is empty".to_string()));
        }
        if self.decimals > MAX_DECIMALS {
            return Err(invalid(format!(
                "precision of {} decimals exceeds the maximum of {}",
                self.decimals, MAX_DECIMALS
            )));
        }
        if let CommonUnit::Item { kilograms } = self.unit {
            check_positive(kilograms, "common unit item mass").map_err(invalid)?;
        }
        check_positive(self.synthetic_reference, "synthetic reference").map_err(invalid)?;

        for (label, side) in [("ledger", &self.ledger), ("market", &self.market)] {
            check_positive(side.price_scale, &format!("{} price scale", label)).map_err(invalid)?;
            check_positive(side.quantity.kilograms(), &format!("{} quantity mass", label))
                .map_err(invalid)?;
            check_positive(side.basis_adjustment, &format!("{} basis adjustment", label))
                .map_err(invalid)?;
        }

        Ok(())
    }
}

fn check_positive(value: f64, what: &str) -> std::result::Result<(), String> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(format!("{} must be a positive finite number, got {}", what, value))
    }
}

/// Commodity-to-pipeline lookup shared by every conversion in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConversionTable {
    #[serde(default)]
    pub rates: ExchangeRates,
    pub pipelines: BTreeMap<CommodityId, ConversionPipeline>,
}

impl Default for ConversionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ConversionTable {
    pub fn builtin() -> Self {
        let mut pipelines = BTreeMap::new();

        pipelines.insert(
            CommodityId::Wheat,
            ConversionPipeline {
                currency: Currency::Ngn,
                unit: CommonUnit::Kilogram,
                unit_label: "NGN/kg".to_string(),
                decimals: 2,
                ledger: SideConversion {
                    currency: Currency::Ghs,
                    price_scale: 1.0,
                    quantity: QuantityBasis::Kilogram,
                    basis_adjustment: 1.0,
                },
                market: SideConversion {
                    currency: Currency::Usd,
                    price_scale: 0.01,
                    quantity: QuantityBasis::Bushel {
                        kilograms: KG_PER_WHEAT_BUSHEL,
                    },
                    basis_adjustment: 1.0,
                },
                synthetic_reference: 550.0,
            },
        );

        pipelines.insert(
            CommodityId::Palm,
            ConversionPipeline {
                currency: Currency::Ghs,
                unit: CommonUnit::Kilogram,
                unit_label: "GHS/kg".to_string(),
                decimals: 2,
                ledger: SideConversion {
                    currency: Currency::Ghs,
                    price_scale: 1.0,
                    quantity: QuantityBasis::Item {
                        kilograms: KG_PER_PALM_OIL_CAN,
                    },
                    basis_adjustment: 1.0,
                },
                market: SideConversion {
                    currency: Currency::Usd,
                    price_scale: 1.0,
                    quantity: QuantityBasis::Tonne,
                    basis_adjustment: 1.0,
                },
                synthetic_reference: 1050.0,
            },
        );

        pipelines.insert(
            CommodityId::CrudePalm,
            ConversionPipeline {
                currency: Currency::Usd,
                unit: CommonUnit::Kilogram,
                unit_label: "USD/kg".to_string(),
                decimals: 3,
                ledger: SideConversion {
                    currency: Currency::Usd,
                    price_scale: 1.0,
                    quantity: QuantityBasis::Barrel {
                        kilograms: KG_PER_CRUDE_PALM_BARREL,
                    },
                    basis_adjustment: 1.0,
                },
                market: SideConversion {
                    currency: Currency::Usd,
                    price_scale: 1.0,
                    quantity: QuantityBasis::Tonne,
                    basis_adjustment: 1.12,
                },
                synthetic_reference: 900.0,
            },
        );

        pipelines.insert(
            CommodityId::Sugar,
            ConversionPipeline {
                currency: Currency::Ngn,
                unit: CommonUnit::Kilogram,
                unit_label: "NGN/kg".to_string(),
                decimals: 2,
                ledger: SideConversion {
                    currency: Currency::Ngn,
                    price_scale: 1.0,
                    quantity: QuantityBasis::Item {
                        kilograms: KG_PER_SUGAR_BAG,
                    },
                    basis_adjustment: 1.0,
                },
                market: SideConversion {
                    currency: Currency::Usd,
                    price_scale: 0.01,
                    quantity: QuantityBasis::Pound,
                    basis_adjustment: 1.0,
                },
                synthetic_reference: 19.0,
            },
        );

        pipelines.insert(
            CommodityId::Aluminum,
            ConversionPipeline {
                currency: Currency::Usd,
                unit: CommonUnit::Item {
                    kilograms: KG_PER_ALUMINUM_CAN,
                },
                unit_label: "USD/can".to_string(),
                decimals: 4,
                ledger: SideConversion {
                    currency: Currency::Usd,
                    price_scale: 1.0,
                    quantity: QuantityBasis::Item {
                        kilograms: KG_PER_ALUMINUM_CAN,
                    },
                    basis_adjustment: 1.0,
                },
                market: SideConversion {
                    currency: Currency::Usd,
                    price_scale: 1.0,
                    quantity: QuantityBasis::Tonne,
                    basis_adjustment: 1.0,
                },
                synthetic_reference: 2400.0,
            },
        );

        Self {
            rates: ExchangeRates::default(),
            pipelines,
        }
    }

    pub fn pipeline(&self, commodity: CommodityId) -> Result<&ConversionPipeline> {
        self.pipelines
            .get(&commodity)
            .ok_or(CommodityPriceError::MissingPipeline(commodity))
    }

    /// Picks the pipeline for a commodity, taking the wheat grade into account.
    pub fn resolve(
        &self,
        commodity: CommodityId,
        wheat_variant: WheatVariant,
    ) -> Result<&ConversionPipeline> {
        match (commodity, wheat_variant) {
            (CommodityId::Wheat, WheatVariant::Milling) => self.pipeline(CommodityId::Wheat),
            (other, _) => self.pipeline(other),
        }
    }

    pub fn to_common_unit(
        &self,
        commodity: CommodityId,
        raw: Option<f64>,
        source: SourceKind,
    ) -> Result<Option<f64>> {
        self.to_common_unit_in(commodity, raw, source, None)
    }

    pub fn to_common_unit_in(
        &self,
        commodity: CommodityId,
        raw: Option<f64>,
        source: SourceKind,
        currency: Option<Currency>,
    ) -> Result<Option<f64>> {
        let pipeline = self.pipeline(commodity)?;
        Ok(pipeline.to_common_unit(&self.rates, raw, source, currency))
    }

    pub fn from_common_unit(
        &self,
        commodity: CommodityId,
        value: Option<f64>,
        source: SourceKind,
    ) -> Result<Option<f64>> {
        let pipeline = self.pipeline(commodity)?;
        Ok(pipeline.from_common_unit(&self.rates, value, source, None))
    }

    pub fn display_format(&self, commodity: CommodityId) -> Result<DisplayFormat> {
        Ok(self.pipeline(commodity)?.display_format())
    }

    pub fn validate(&self) -> Result<()> {
        for (currency, rate) in [
            ("ghs_to_usd", self.rates.ghs_to_usd),
            ("usd_to_ngn", self.rates.usd_to_ngn),
        ] {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(CommodityPriceError::InvalidConversionRate {
                    rate: currency.to_string(),
                    value: rate,
                });
            }
        }

        for (commodity, pipeline) in &self.pipelines {
            pipeline.validate(*commodity)?;
        }

        Ok(())
    }
}

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
