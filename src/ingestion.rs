use crate::error::{CommodityPriceError, Result};
use crate::schema::{amount_from_value, parse_amount, RawMarketQuote};
use chrono::{DateTime, Utc};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Column layout of a delimited vendor download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DelimitedLayout {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub date_column: usize,
    #[serde(default = "default_close_column")]
    pub close_column: usize,
    #[serde(default = "default_has_header")]
    pub has_header: bool,
}

fn default_delimiter() -> char {
    ','
}

fn default_close_column() -> usize {
    4
}

fn default_has_header() -> bool {
    true
}

impl Default for DelimitedLayout {
    /// `Date,Open,High,Low,Close[,Volume]`
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            date_column: 0,
            close_column: default_close_column(),
            has_header: default_has_header(),
        }
    }
}

/// Reads closing prices out of delimited text.
///
/// Rows too short to hold both columns are skipped. A close that does not
/// parse is kept as a missing value so the row still shows up in counts.
pub fn parse_delimited_quotes(text: &str, layout: &DelimitedLayout) -> Result<Vec<RawMarketQuote>> {
    if !layout.delimiter.is_ascii() {
        return Err(CommodityPriceError::ParseError(format!(
            "delimiter '{}' is not a single-byte character",
            layout.delimiter
        )));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(layout.delimiter as u8)
        .has_headers(layout.has_header)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut quotes = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let (Some(date), Some(close)) = (
            record.get(layout.date_column),
            record.get(layout.close_column),
        ) else {
            debug!("Skipping delimited row {}: only {} columns", line, record.len());
            continue;
        };
        if date.is_empty() {
            continue;
        }

        quotes.push(RawMarketQuote {
            date: date.to_string(),
            raw_value: parse_amount(close),
        });
    }

    Ok(quotes)
}

#[derive(Debug, Deserialize)]
struct ResultsEnvelope {
    #[serde(default)]
    results: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ResultQuote {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    t: Option<serde_json::Value>,
    #[serde(default, alias = "close", alias = "value")]
    c: Option<serde_json::Value>,
}

/// Reads a `{"results": [...]}` payload. Each entry needs a `date` string or a
/// `t` epoch-millisecond timestamp, and a close under `c`, `close` or `value`.
/// Entries without any usable date are skipped; a missing `results` array is an
/// empty result, while text that is not a JSON object is an error.
pub fn parse_results_json(text: &str) -> Result<Vec<RawMarketQuote>> {
    let envelope: ResultsEnvelope = serde_json::from_str(text)?;
    let Some(results) = envelope.results else {
        debug!("Market payload has no results array");
        return Ok(Vec::new());
    };

    let mut quotes = Vec::with_capacity(results.len());
    for (idx, value) in results.into_iter().enumerate() {
        let entry: ResultQuote = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping result #{}: {}", idx, e);
                continue;
            }
        };

        let date = entry.date.or_else(|| {
            entry
                .t
                .as_ref()
                .and_then(amount_from_value)
                .and_then(|millis| DateTime::<Utc>::from_timestamp_millis(millis.round() as i64))
                .map(|dt| dt.format("%Y-%m-%d").to_string())
        });
        let Some(date) = date else {
            debug!("Skipping result #{}: no date or timestamp", idx);
            continue;
        };

        quotes.push(RawMarketQuote {
            date,
            raw_value: entry.c.as_ref().and_then(amount_from_value),
        });
    }

    Ok(quotes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_layout() {
        let text = "Date,Open,High,Low,Close,Volume\n\
                    2025-06-02,540.0,552.5,538.25,550.75,1200\n\
                    2025-06-03,550.0,551.0,541.0,544.5,900\n";
        let quotes = parse_delimited_quotes(text, &DelimitedLayout::default()).unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].date, "2025-06-02");
        assert_eq!(quotes[0].raw_value, Some(550.75));
        assert_eq!(quotes[1].raw_value, Some(544.5));
    }

    #[test]
    fn test_short_and_bad_rows() {
        let text = "Date,Open,High,Low,Close\n\
                    2025-06-02,540.0\n\
                    2025-06-03,1,2,3,N/A\n\
                    \n\
                    # vendor note\n\
                    6/4/2025,1,2,3,\"1,045.25\"\n";
        let quotes = parse_delimited_quotes(text, &DelimitedLayout::default()).unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].date, "2025-06-03");
        assert_eq!(quotes[0].raw_value, None);
        assert_eq!(quotes[1].date, "6/4/2025");
        assert_eq!(quotes[1].raw_value, Some(1045.25));
    }

    #[test]
    fn test_custom_layout() {
        let layout = DelimitedLayout {
            delimiter: ';',
            date_column: 1,
            close_column: 2,
            has_header: false,
        };
        let quotes = parse_delimited_quotes("SB;Apr-24;19.85\nSB;May-24;18.4\n", &layout).unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].date, "Apr-24");
        assert_eq!(quotes[1].raw_value, Some(18.4));
    }

    #[test]
    fn test_parse_results_json() {
        let json = r#"{
            "status": "OK",
            "results": [
                {"t": 1735689600000, "o": 540.0, "c": 551.5},
                {"date": "2025-02-03", "close": "548.25"},
                {"date": "2025-03-03", "value": null},
                {"c": 530.0},
                "not an object"
            ]
        }"#;

        let quotes = parse_results_json(json).unwrap();
        assert_eq!(quotes.len(), 3);
        assert_eq!(quotes[0].date, "2025-01-01");
        assert_eq!(quotes[0].raw_value, Some(551.5));
        assert_eq!(quotes[1].raw_value, Some(548.25));
        assert_eq!(quotes[2].raw_value, None);
    }

    #[test]
    fn test_results_json_float_and_string_timestamps() {
        let json = r#"{"results": [
            {"t": 1735689600000.0, "c": 551.5},
            {"t": "1738368000000", "c": 548.0},
            {"t": 1.0e300, "c": 530.0},
            {"t": true, "c": 529.0}
        ]}"#;

        let quotes = parse_results_json(json).unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].date, "2025-01-01");
        assert_eq!(quotes[0].raw_value, Some(551.5));
        assert_eq!(quotes[1].date, "2025-02-01");
    }

    #[test]
    fn test_results_json_edge_cases() {
        assert!(parse_results_json(r#"{"status": "DELAYED"}"#)
            .unwrap()
            .is_empty());
        assert!(parse_results_json(r#"{"results": []}"#).unwrap().is_empty());
        assert!(matches!(
            parse_results_json("<html>rate limited</html>"),
            Err(CommodityPriceError::SerializationError(_))
        ));
    }
}
