use std::fmt;
use std::time::Duration;

/// A typed value held by one field of a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Re-types a raw cell: integer first, then a finite decimal such as `5.5`,
    /// otherwise text.
    pub fn infer(raw: &str) -> Self {
        if let Ok(value) = raw.parse::<i64>() {
            return Self::Integer(value);
        }
        if is_decimal(raw) {
            if let Ok(value) = raw.parse::<f64>() {
                if value.is_finite() {
                    return Self::Float(value);
                }
            }
        }
        Self::Text(raw.to_string())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{}", value),
            // Keep the decimal point so the value reads back as a float.
            Self::Float(value) if value.is_finite() && value.fract() == 0.0 => {
                write!(f, "{:.1}", value)
            }
            Self::Float(value) => write!(f, "{}", value),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// `[-+]digits.digits`, with digits on at least one side of the point.
fn is_decimal(raw: &str) -> bool {
    let unsigned = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    match unsigned.split_once('.') {
        Some((whole, fraction)) => {
            !(whole.is_empty() && fraction.is_empty())
                && whole.chars().all(|c| c.is_ascii_digit())
                && fraction.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// The structured output of parsing one page.
///
/// Fields keep their insertion order, which is also the column order used
/// when records are exported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, replacing the value of an existing field with the same name.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The outcome of one full batch run: elapsed wall-clock time and one record
/// per input identifier, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub elapsed: Duration,
    pub records: Vec<Record>,
}

impl BatchResult {
    pub fn empty() -> Self {
        Self {
            elapsed: Duration::ZERO,
            records: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_existing_field() {
        let mut record = Record::new().with_field("name", "Gallia").with_field("volume", 33_i64);
        record.insert("name", "Gallia Pale");

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("name").and_then(FieldValue::as_text), Some("Gallia Pale"));
        assert_eq!(record.field_names().collect::<Vec<_>>(), vec!["name", "volume"]);
    }

    #[test]
    fn test_infer_field_value() {
        assert_eq!(FieldValue::infer("33"), FieldValue::Integer(33));
        assert_eq!(FieldValue::infer("6.5"), FieldValue::Float(6.5));
        assert_eq!(FieldValue::infer("France"), FieldValue::Text("France".to_string()));
        assert_eq!(FieldValue::infer("8.0"), FieldValue::Float(8.0));
        assert_eq!(FieldValue::infer("-.5"), FieldValue::Float(-0.5));
    }

    #[test]
    fn test_infer_keeps_non_numeric_words_as_text() {
        for word in ["inf", "-inf", "nan", "NaN", "infinity", "1e5", ".", "8.", "4,7"] {
            let expected = if word == "8." {
                FieldValue::Float(8.0)
            } else {
                FieldValue::Text(word.to_string())
            };
            assert_eq!(FieldValue::infer(word), expected, "{}", word);
        }
    }

    #[test]
    fn test_whole_floats_keep_their_decimal_point() {
        assert_eq!(FieldValue::Float(8.0).to_string(), "8.0");
        assert_eq!(FieldValue::Float(5.5).to_string(), "5.5");
        assert_eq!(FieldValue::Integer(8).to_string(), "8");
    }
}
