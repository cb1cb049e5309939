use num_format::{Locale, ToFormattedString};

/// Parses a decimal the way the indexer and the store hand them out. Anything
/// that isn't a number comes back as NaN instead of an error.
pub fn lossy_f64(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Reads a stored aggregate. Absent keys count as zero.
pub fn stored_f64(value: Option<String>) -> f64 {
    match value {
        Some(v) => lossy_f64(Some(&v)),
        None => 0.0,
    }
}

/// fraction digits kept, as en-US locale formatting does
const FRACTION_DIGITS: u32 = 3;

/// amounts this large are printed in scientific notation instead of grouped
const MAX_GROUPED_USD: f64 = 1e30;

/// `1234567.8915` -> `1,234,567.892`
pub fn format_usd(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value.abs() >= MAX_GROUPED_USD {
        return format!("{value:e}");
    }

    let scale = 10u128.pow(FRACTION_DIGITS);
    let scaled = (value.abs() * scale as f64).round() as u128;
    let (whole, fraction) = (scaled / scale, scaled % scale);
    let sign = if value < 0.0 && scaled != 0 { "-" } else { "" };
    let whole = whole.to_formatted_string(&Locale::en);

    if fraction == 0 {
        return format!("{sign}{whole}");
    }

    let fraction = format!("{fraction:0width$}", width = FRACTION_DIGITS as usize);
    format!("{sign}{whole}.{}", fraction.trim_end_matches('0'))
}

pub mod serde_str_u64 {
    use serde::de::{Deserialize, Deserializer, Error};

    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum StrOrNum {
        Str(String),
        Num(u64),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match StrOrNum::deserialize(deserializer)? {
            StrOrNum::Str(s) => s.trim().parse().map_err(Error::custom),
            StrOrNum::Num(n) => Ok(n),
        }
    }
}

/// Subgraphs are inconsistent about quoting numeric fields, so accept both and
/// keep the raw text.
pub mod serde_lenient_string {
    use serde::de::{Deserialize, Deserializer};

    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Str(String),
        Num(serde_json::Number),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(
            Option::<Lenient>::deserialize(deserializer)?.map(|v| match v {
                Lenient::Str(s) => s,
                Lenient::Num(n) => n.to_string(),
            }),
        )
    }
}

/// Reads an explicit `null` the same as a missing field.
pub mod serde_null_default {
    use serde::de::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }
}
