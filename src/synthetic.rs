use crate::error::{CommodityPriceError, Result};
use crate::month_key::MonthKey;
use crate::schema::{DataProvenance, RawMarketQuote};
use rand::rngs::StdRng;
use rand::{thread_rng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// What the fetch layer handed over for the market side.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketFeed {
    /// Quotes returned by the vendor. May be empty or patchy.
    Live(Vec<RawMarketQuote>),
    /// The vendor could not be reached or answered with garbage.
    Unavailable { reason: String },
}

impl MarketFeed {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        MarketFeed::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn provenance(&self) -> DataProvenance {
        match self {
            MarketFeed::Live(_) => DataProvenance::Live,
            MarketFeed::Unavailable { .. } => DataProvenance::Synthetic,
        }
    }
}

impl<E: std::fmt::Display> From<std::result::Result<Vec<RawMarketQuote>, E>> for MarketFeed {
    fn from(result: std::result::Result<Vec<RawMarketQuote>, E>) -> Self {
        match result {
            Ok(quotes) => MarketFeed::Live(quotes),
            Err(e) => MarketFeed::unavailable(e.to_string()),
        }
    }
}

/// Placeholder market quotes scattered around a reference price.
#[derive(Debug, Clone)]
pub struct SyntheticQuoteGenerator {
    reference: f64,
    noise: Normal<f64>,
}

impl SyntheticQuoteGenerator {
    pub fn new(reference: f64, noise_factor: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&noise_factor) {
            return Err(CommodityPriceError::InvalidNoiseFactor(noise_factor));
        }
        let noise = Normal::new(0.0, noise_factor)
            .map_err(|_| CommodityPriceError::InvalidNoiseFactor(noise_factor))?;
        Ok(Self { reference, noise })
    }

    /// One quote per month, dated with the month key itself.
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        months: &[MonthKey],
        rng: &mut R,
    ) -> Vec<RawMarketQuote> {
        months
            .iter()
            .map(|month| {
                let value = self.reference * (1.0 + self.noise.sample(rng));
                RawMarketQuote::new(month.to_string(), value.max(0.0))
            })
            .collect()
    }

    /// Uses a seeded generator when `seed` is given so repeated runs agree.
    pub fn generate(&self, months: &[MonthKey], seed: Option<u64>) -> Vec<RawMarketQuote> {
        match seed {
            Some(seed) => self.generate_with_rng(months, &mut StdRng::seed_from_u64(seed)),
            None => self.generate_with_rng(months, &mut thread_rng()),
        }
    }
}
