use crate::schema::CommodityId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommodityPriceError {
    #[error("Unknown commodity identifier: {0}")]
    UnknownCommodity(String),

    #[error("No conversion pipeline configured for commodity: {0}")]
    MissingPipeline(CommodityId),

    #[error("Invalid conversion settings for {commodity}: {details}")]
    ValidationError {
        commodity: CommodityId,
        details: String,
    },

    #[error("Invalid exchange rate {rate} = {value}: must be a positive finite number")]
    InvalidConversionRate { rate: String, value: f64 },

    #[error("Invalid noise factor {0}: must be between 0.0 and 1.0")]
    InvalidNoiseFactor(f64),

    #[error("Invalid year window: {0}")]
    InvalidYearWindow(String),

    #[error("Malformed market data: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Delimited data error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "vendor")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[cfg(feature = "vendor")]
    #[error("Vendor request failed: {0}")]
    VendorError(String),
}

pub type Result<T> = std::result::Result<T, CommodityPriceError>;
