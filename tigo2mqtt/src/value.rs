use std::fmt;

/// Cell text the appliance reports when an optimizer has no reading.
pub const ABSENT: &str = "n-a";

/// A single normalized table cell.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl MetricValue {
    /// `n-a` cells are kept in the snapshot but never published as a state.
    pub fn is_absent(&self) -> bool {
        matches!(self, MetricValue::Text(text) if text == ABSENT)
    }

    pub fn to_payload(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Integer(value) => write!(f, "{value}"),
            MetricValue::Float(value) => write_float(f, *value),
            MetricValue::Text(text) => f.write_str(text),
        }
    }
}

/// Floats keep the rendering dashboards already store: a trailing `.0` on
/// whole values, and exponent notation like `1e+16` or `1e-05` outside
/// `1e-4 <= |x| < 1e16`.
fn write_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    let magnitude = value.abs();
    if !value.is_finite() {
        write!(f, "{value}")
    } else if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let scientific = format!("{value:e}");
        match scientific.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                write!(f, "{mantissa}e{sign}{digits:0>2}")
            }
            None => f.write_str(&scientific),
        }
    } else if value.fract() == 0.0 {
        write!(f, "{value:.1}")
    } else {
        write!(f, "{value}")
    }
}

/// Converts the text of a status table cell into a typed value.
///
/// Substitutions run first and in a fixed order, then numeric coercion is
/// attempted: a decimal point selects a float parse, anything else an integer
/// parse. Text that parses as neither is returned after substitution.
///
/// Note that `on`/`off` are replaced as substrings, so any text containing
/// them as an infix is rewritten as well.
pub fn normalize(raw: &str) -> MetricValue {
    let text = substitute(raw.trim());
    match parse_number(&text) {
        Some(value) => value,
        None => MetricValue::Text(text),
    }
}

fn substitute(cell: &str) -> String {
    cell.replace('%', "")
        .replace('\u{a0}', "_")
        .replace("on", "1")
        .replace("off", "0")
        .replace('/', "-")
}

fn parse_number(text: &str) -> Option<MetricValue> {
    let digits = strip_digit_separators(text.trim());
    if digits.contains('.') {
        digits.parse::<f64>().ok().map(MetricValue::Float)
    } else {
        digits.parse::<i64>().ok().map(MetricValue::Integer)
    }
}

/// Drops each `_` that sits between two ASCII digits, so a grouped
/// `1_234` reads as `1234`. Leading, trailing and doubled underscores stay
/// and make the parse fail.
fn strip_digit_separators(text: &str) -> String {
    let bytes = text.as_bytes();
    text.char_indices()
        .filter(|&(i, c)| {
            c != '_'
                || !(i > 0
                    && bytes[i - 1].is_ascii_digit()
                    && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
        })
        .map(|(_, c)| c)
        .collect()
}
