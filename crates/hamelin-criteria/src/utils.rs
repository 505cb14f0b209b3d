//! Shared helpers for column typing and value parsing.

use polars::prelude::*;

/// Characters commonly used in numeric formatting that are stripped before parsing.
pub const NUMERIC_FORMAT_CHARS: [char; 4] = [',', '$', '%', ' '];

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Clean a string for numeric parsing by removing formatting characters.
///
/// ```
/// use hamelin_criteria::utils::clean_numeric_string;
///
/// assert_eq!(clean_numeric_string(" 1,234.5 "), "1234.5");
/// ```
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Try to parse a user-entered string as a finite number.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Format a number the way it reads in a table cell.
///
/// Integral values print without a fractional part so `18.0` compares equal
/// to a text cell holding `"18"`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Cast a column to `Float64` and collect its values, nulls preserved.
pub fn numeric_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let casted = series.cast(&DataType::Float64)?;
    Ok(casted.f64()?.into_iter().collect())
}

/// Render every cell of a column as text, nulls preserved.
pub fn string_values(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    if is_numeric_dtype(series.dtype()) {
        return Ok(numeric_values(series)?
            .into_iter()
            .map(|v| v.map(format_number))
            .collect());
    }
    let casted = series.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_string() {
        assert_eq!(parse_numeric_string("42"), Some(42.0));
        assert_eq!(parse_numeric_string(" 1,000 "), Some(1000.0));
        assert_eq!(parse_numeric_string("-3.5"), Some(-3.5));
        assert_eq!(parse_numeric_string("responder"), None);
        assert_eq!(parse_numeric_string(""), None);
        assert_eq!(parse_numeric_string("NaN"), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(18.0), "18");
        assert_eq!(format_number(-2.0), "-2");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[test]
    fn test_string_values_from_integers() {
        let series = Series::new("age".into(), &[Some(18i64), None, Some(90)]);
        let values = string_values(&series).unwrap();
        assert_eq!(
            values,
            vec![Some("18".to_string()), None, Some("90".to_string())]
        );
    }

    #[test]
    fn test_numeric_values_preserve_nulls() {
        let series = Series::new("bmi".into(), &[Some(21.5f64), None]);
        assert_eq!(numeric_values(&series).unwrap(), vec![Some(21.5), None]);
    }

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int32));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }
}
