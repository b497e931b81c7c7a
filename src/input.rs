use crate::error::{NemoError, NemoResult};

/// Tokenizes one external input line into finite values.
///
/// An empty line yields `None` and is skipped by the run driver. Any other
/// line must produce at least one token, and every token must parse to a
/// finite number.
pub fn parse_line(line: &str, line_number: usize) -> NemoResult<Option<Vec<f64>>> {
    if line.is_empty() {
        return Ok(None);
    }

    let values = line
        .split_whitespace()
        .map(|token| parse_token(token, line_number))
        .collect::<NemoResult<Vec<_>>>()?;

    if values.is_empty() {
        return Err(NemoError::InputShape(format!(
            "line {}: no values",
            line_number
        )));
    }

    Ok(Some(values))
}

fn parse_token(token: &str, line_number: usize) -> NemoResult<f64> {
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(NemoError::InputShape(format!(
            "line {}: invalid value '{}'",
            line_number, token
        ))),
    }
}

/// Converts an external value into a DS code: negative values map to 0 and
/// fractions are truncated.
pub fn value_to_code(value: f64) -> u32 {
    value.max(0.0).min(u32::MAX as f64) as u32
}
