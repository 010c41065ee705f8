//! Mapping from a CSV row to the catalog's product payload.

use crate::contract::{
    PriceEntry, ProductPayload, RowRecord, ACTIVE, DESCRIPTION, EAN, NAME, PRICE, PRODUCT_NUMBER,
    STOCK, WEIGHT,
};
use crate::error::PayloadError;

/// Gross prices in the data file include 19% VAT.
pub const TAX_RATE_FACTOR: f64 = 1.19;

/// Default currency (EUR) of the target shop.
pub const CURRENCY_ID: &str = "b7d2554b0ce847cd82f3ac9bd1c0dfca";

/// Default 19% tax rule of the target shop.
pub const TAX_ID: &str = "f5c428b9cd2e455b9b2d3c9b9d9f1c85";

const TRUE_WORDS: [&str; 5] = ["true", "1", "yes", "y", "on"];
const FALSE_WORDS: [&str; 5] = ["false", "0", "no", "n", "off"];

/// Build the create/update body for `row`.
pub fn to_payload(row: &RowRecord) -> Result<ProductPayload, PayloadError> {
    let product_number = row
        .get(PRODUCT_NUMBER)
        .ok_or(PayloadError::MissingField(PRODUCT_NUMBER))?
        .to_string();

    let gross = match row.get(PRICE) {
        Some(raw) => parse_number(PRICE, raw)?,
        None => 0.0,
    };

    let stock = match row.get(STOCK) {
        Some(raw) => parse_stock(raw)?,
        None => 0,
    };

    let weight = row
        .get(WEIGHT)
        .map(|raw| parse_number(WEIGHT, raw))
        .transpose()?;

    Ok(ProductPayload {
        product_number,
        name: row.get(NAME).map(str::to_string),
        description: row.get(DESCRIPTION).map(str::to_string),
        price: vec![PriceEntry {
            currency_id: CURRENCY_ID.to_string(),
            gross,
            net: gross / TAX_RATE_FACTOR,
            linked: true,
        }],
        stock,
        tax_id: TAX_ID.to_string(),
        active: parse_active(row.get(ACTIVE)),
        weight,
        ean: row.get(EAN).map(str::to_string),
    })
}

fn parse_number(field: &'static str, raw: &str) -> Result<f64, PayloadError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| PayloadError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}

// Fractional stock counts are truncated toward zero.
fn parse_stock(raw: &str) -> Result<i64, PayloadError> {
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(v);
    }
    parse_number(STOCK, raw).map(|v| v.trunc() as i64)
}

/// Absent or unrecognised values keep the product active.
pub fn parse_active(raw: Option<&str>) -> bool {
    let Some(raw) = raw else {
        return true;
    };
    let lowered = raw.trim().to_ascii_lowercase();
    if TRUE_WORDS.contains(&lowered.as_str()) {
        true
    } else if FALSE_WORDS.contains(&lowered.as_str()) {
        false
    } else {
        tracing::debug!(value = raw, "Unrecognised active flag, defaulting to true");
        true
    }
}
