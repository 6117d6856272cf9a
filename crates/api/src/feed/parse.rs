//! Feed decoding and validation.
//!
//! Feeds are attacker-influenced, so decoding is restricted to plain data:
//! the document is deserialized straight into [`Feed`], and anchors, aliases
//! and tags are rejected before the YAML parser sees them.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use rust_decimal::Decimal;
use serde::Deserializer;
use serde::de::{self, MapAccess, Visitor};

use super::{Feed, FeedError};

/// Prices are stored as `NUMERIC(12, 2)`.
const MAX_PRICE_SCALE: u32 = 2;
const MAX_PRICE_DIGITS: u32 = 12;

/// Decode and validate a feed document.
///
/// # Errors
///
/// - [`FeedError::UnsupportedConstruct`] for anchors, aliases or tags
/// - [`FeedError::Malformed`] for missing keys, wrong types or invalid YAML
/// - [`FeedError::Invalid`] for well-typed but inconsistent contents
pub fn parse_feed(bytes: &[u8]) -> Result<Feed, FeedError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| FeedError::Malformed(format!("feed is not valid UTF-8: {e}")))?;

    reject_non_plain_constructs(text)?;

    let feed: Feed =
        serde_yaml::from_str(text).map_err(|e| FeedError::Malformed(e.to_string()))?;

    validate(&feed)?;
    Ok(feed)
}

fn validate(feed: &Feed) -> Result<(), FeedError> {
    if feed.shop.trim().is_empty() {
        return Err(FeedError::Invalid("shop name is empty".to_string()));
    }

    let mut category_ids = HashSet::with_capacity(feed.categories.len());
    for category in &feed.categories {
        if !category_ids.insert(category.id) {
            return Err(FeedError::Invalid(format!(
                "category {} is listed more than once",
                category.id
            )));
        }
        if category.name.trim().is_empty() {
            return Err(FeedError::Invalid(format!(
                "category {} has an empty name",
                category.id
            )));
        }
    }

    let mut good_ids = HashSet::with_capacity(feed.goods.len());
    for good in &feed.goods {
        if !good_ids.insert(good.id) {
            return Err(FeedError::Invalid(format!(
                "good {} is listed more than once",
                good.id
            )));
        }
        if good.name.trim().is_empty() {
            return Err(FeedError::Invalid(format!("good {} has an empty name", good.id)));
        }
        check_price(good.id, "price", good.price)?;
        check_price(good.id, "price_rrc", good.price_rrc)?;
        if good.quantity < 0 {
            return Err(FeedError::Invalid(format!(
                "good {} has a negative quantity",
                good.id
            )));
        }
    }

    Ok(())
}

fn check_price(good: i64, field: &str, value: Decimal) -> Result<(), FeedError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(FeedError::Invalid(format!("good {good} has a negative {field}")));
    }
    if value.normalize().scale() > MAX_PRICE_SCALE {
        return Err(FeedError::Invalid(format!(
            "good {good} {field} has more than {MAX_PRICE_SCALE} decimal places"
        )));
    }
    if value >= Decimal::from(10_i64.pow(MAX_PRICE_DIGITS - MAX_PRICE_SCALE)) {
        return Err(FeedError::Invalid(format!("good {good} {field} is too large")));
    }
    Ok(())
}

// =============================================================================
// Plain-data guard
// =============================================================================

/// Reject YAML anchors (`&a`), aliases (`*a`) and tags (`!t`).
///
/// The scan works line by line and only looks at the first character of each
/// node. Quoted scalars, comments and block scalar bodies are skipped, so text
/// like `name: Black & White` is accepted. Commas and brackets only separate
/// nodes inside flow collections; in block context they are scalar text.
///
/// Merge keys (`<<`) pass the scan. Without aliases they can only merge an
/// inline mapping, which carries nothing the typed [`Feed`] would not.
fn reject_non_plain_constructs(text: &str) -> Result<(), FeedError> {
    let mut block_indent: Option<usize> = None;
    let mut flow_depth = 0_usize;

    for (index, line) in text.lines().enumerate() {
        let indent = line.len() - line.trim_start().len();

        if let Some(parent) = block_indent {
            if line.trim().is_empty() || indent > parent {
                continue;
            }
            block_indent = None;
        }

        if scan_line(line, &mut flow_depth).map_err(|construct| {
            FeedError::UnsupportedConstruct {
                line: index + 1,
                construct,
            }
        })? {
            block_indent = Some(indent);
        }
    }

    Ok(())
}

/// Scan one line, carrying the flow collection depth across lines.
///
/// Returns `Ok(true)` if the line opens a block scalar.
fn scan_line(line: &str, flow_depth: &mut usize) -> Result<bool, &'static str> {
    let chars: Vec<char> = line.chars().collect();
    let ends_indicator = |i: usize| chars.get(i + 1).is_none_or(|n| *n == ' ' || *n == '\t');
    let mut at_node_start = true;
    let mut last_node_start = None;
    let mut i = 0;

    while let Some(&c) = chars.get(i) {
        if at_node_start {
            match c {
                ' ' | '\t' => {
                    i += 1;
                    continue;
                }
                '&' => return Err("anchors"),
                '*' => return Err("aliases"),
                '!' => return Err("tags"),
                '#' => break,
                '\'' | '"' => {
                    i = skip_quoted(&chars, i);
                    at_node_start = false;
                    continue;
                }
                // "- " opens a sequence item, "? " a complex key
                '-' | '?' if ends_indicator(i) => {
                    i += 1;
                    continue;
                }
                '[' | '{' => {
                    *flow_depth += 1;
                    i += 1;
                    continue;
                }
                ',' if *flow_depth > 0 => {
                    i += 1;
                    continue;
                }
                _ => {}
            }
            last_node_start = Some(i);
            at_node_start = false;
        }

        match c {
            ':' if ends_indicator(i) => at_node_start = true,
            ',' if *flow_depth > 0 => at_node_start = true,
            '[' | '{' if *flow_depth > 0 => {
                *flow_depth += 1;
                at_node_start = true;
            }
            ']' | '}' if *flow_depth > 0 => *flow_depth -= 1,
            '#' if i > 0 && chars.get(i - 1).is_some_and(|p| *p == ' ') => break,
            _ => {}
        }
        i += 1;
    }

    let opens_block = *flow_depth == 0
        && last_node_start.is_some_and(|start| {
            let rest: String = chars.iter().skip(start).collect();
            let mut it = rest.trim_end().chars();
            matches!(it.next(), Some('|' | '>'))
                && it.all(|c| c == '-' || c == '+' || c.is_ascii_digit())
        });

    Ok(opens_block)
}

/// Return the index just past a quoted scalar that starts at `start`.
fn skip_quoted(chars: &[char], start: usize) -> usize {
    let Some(&quote) = chars.get(start) else {
        return start;
    };
    let mut i = start + 1;
    while let Some(&c) = chars.get(i) {
        if quote == '"' && c == '\\' {
            i += 2;
            continue;
        }
        if c == quote {
            // '' is an escaped quote inside a single-quoted scalar
            if quote == '\'' && chars.get(i + 1).is_some_and(|n| *n == '\'') {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    i
}

// =============================================================================
// Parameter values
// =============================================================================

/// Deserialize a mapping whose values may be any scalar, keeping them as text.
///
/// Sellers write `"Встроенная память (Гб)": 512` as often as quoted strings.
pub(super) fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ScalarMap;

    impl<'de> Visitor<'de> for ScalarMap {
        type Value = BTreeMap<String, String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a mapping of parameter names to scalar values")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut out = BTreeMap::new();
            while let Some((key, value)) = access.next_entry::<Scalar, Scalar>()? {
                if out.insert(key.0.clone(), value.0).is_some() {
                    return Err(de::Error::custom(format!("duplicate parameter '{}'", key.0)));
                }
            }
            Ok(out)
        }

        // `parameters:` with nothing after it
        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(BTreeMap::new())
        }
    }

    deserializer.deserialize_any(ScalarMap)
}

/// Deserialize a price written either as a number or as a quoted string.
pub(super) fn decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let Scalar(raw) = serde::Deserialize::deserialize(deserializer)?;
    raw.trim()
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(raw.trim()))
        .map_err(|_| de::Error::custom(format!("invalid price '{raw}'")))
}

/// Any YAML scalar rendered as a string.
struct Scalar(String);

impl<'de> serde::Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScalarVisitor;

        impl Visitor<'_> for ScalarVisitor {
            type Value = Scalar;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string, number or boolean")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Scalar, E> {
                Ok(Scalar(v.to_owned()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Scalar, E> {
                Ok(Scalar(v))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Scalar, E> {
                Ok(Scalar(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Scalar, E> {
                Ok(Scalar(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Scalar, E> {
                Ok(Scalar(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Scalar, E> {
                Ok(Scalar(v.to_string()))
            }
        }

        deserializer.deserialize_any(ScalarVisitor)
    }
}
