//! Upgrade steps for ERP integration events that changed shape
//!
//! | Event         | v1 → v2                                                  |
//! |---------------|----------------------------------------------------------|
//! | ItemCreated   | adds `unit_of_measure` ("EA") and `category` (placeholder) |
//! | InvoicePosted | decimal `total` becomes `total_minor`; `currency` defaults to "USD" |

use event_outbox::versioning::payload_object;
use event_outbox::{StepConverter, VersionError, VersionRegistry};
use serde_json::Value;

use crate::contracts::PLACEHOLDER;

/// Unit of measure assumed for items created before units existed
pub const DEFAULT_UNIT_OF_MEASURE: &str = "EA";

/// Currency assumed for invoices posted without one
pub const DEFAULT_CURRENCY: &str = "USD";

pub fn item_created_v1_to_v2(mut payload: Value) -> Result<Value, VersionError> {
    let fields = payload_object(&mut payload, "ItemCreated", 1)?;
    fields
        .entry("unit_of_measure")
        .or_insert_with(|| Value::from(DEFAULT_UNIT_OF_MEASURE));
    fields
        .entry("category")
        .or_insert_with(|| Value::from(PLACEHOLDER));
    Ok(payload)
}

pub fn invoice_posted_v1_to_v2(mut payload: Value) -> Result<Value, VersionError> {
    let fields = payload_object(&mut payload, "InvoicePosted", 1)?;

    let total = fields
        .remove("total")
        .ok_or_else(|| VersionError::MissingField {
            event_type: "InvoicePosted".to_string(),
            version: 1,
            field: "total".to_string(),
        })?;
    let text = match &total {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => format!("{other}"),
    };
    let minor = to_minor_units(&text).map_err(|reason| VersionError::InvalidField {
        event_type: "InvoicePosted".to_string(),
        version: 1,
        field: "total".to_string(),
        reason,
    })?;
    fields.insert("total_minor".to_string(), Value::from(minor));

    let currency_missing = matches!(fields.get("currency"), None | Some(Value::Null));
    if currency_missing {
        fields.insert("currency".to_string(), Value::from(DEFAULT_CURRENCY));
    }

    Ok(payload)
}

/// Exact decimal amount in major units to minor units (cents)
///
/// Works on the decimal text, never through floating point. Sub-cent digits
/// round half away from zero: `"1.005"` is 101, `"-0.285"` is -29. Accepts
/// an exponent (`"1.5e2"`) since that is how JSON numbers may print.
pub fn to_minor_units(text: &str) -> Result<i64, String> {
    let invalid = || format!("expected a decimal amount, got {text:?}");

    let (negative, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(at) => (
            &unsigned[..at],
            unsigned[at + 1..].parse::<i64>().map_err(|_| invalid())?,
        ),
        None => (unsigned, 0),
    };

    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let digits: Vec<u8> = whole
        .bytes()
        .chain(fraction.bytes())
        .map(|b| b - b'0')
        .skip_while(|d| *d == 0)
        .collect();
    let significant = i64::try_from(digits.len()).map_err(|_| invalid())?;
    let leading_zeros =
        i64::try_from(whole.len() + fraction.len()).map_err(|_| invalid())? - significant;

    // Position of the cents boundary within the significant digits
    let point = i64::try_from(whole.len())
        .map_err(|_| invalid())?
        .saturating_add(exponent)
        .saturating_add(2)
        .saturating_sub(leading_zeros);

    let out_of_range = || format!("{text} does not fit in minor units");

    let mut cents: i128 = 0;
    let kept = point.clamp(0, significant) as usize;
    for digit in &digits[..kept] {
        cents = cents
            .checked_mul(10)
            .and_then(|c| c.checked_add(i128::from(*digit)))
            .ok_or_else(out_of_range)?;
    }
    if cents != 0 {
        // Overflows within a few dozen steps, whatever the exponent
        for _ in significant..point {
            cents = cents.checked_mul(10).ok_or_else(out_of_range)?;
        }
    }

    let rounding_digit = match point {
        p if p < 0 => 0,
        p if p < significant => digits[p as usize],
        _ => 0,
    };
    if rounding_digit >= 5 {
        cents = cents.checked_add(1).ok_or_else(out_of_range)?;
    }

    let cents = if negative { -cents } else { cents };
    i64::try_from(cents).map_err(|_| out_of_range())
}

/// Converters for every ERP event type past version 1
pub fn version_registry() -> VersionRegistry {
    let mut versions = VersionRegistry::new();
    versions
        .register(
            "ItemCreated",
            StepConverter::new("ItemCreated").step(item_created_v1_to_v2),
        )
        .register(
            "InvoicePosted",
            StepConverter::new("InvoicePosted").step(invoice_posted_v1_to_v2),
        );
    versions
}
