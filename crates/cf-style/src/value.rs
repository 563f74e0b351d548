//! Tagged style setting values.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};

/// A style setting value.
///
/// Settings form a tree: maps hold nested settings, while scalars and lists
/// are leaves. Deserializes from TOML or JSON, where strings, numbers and
/// booleans all become [`Scalar`](Self::Scalar)s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StyleValue {
    /// Single CSS value (e.g., `"0.85rem"`).
    Scalar(String),
    /// Ordered list of CSS values, joined with `, ` when emitted.
    List(Vec<String>),
    /// Nested settings.
    Map(BTreeMap<String, StyleValue>),
}

/// Kind of a [`StyleValue`], used to detect merge conflicts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    /// A [`StyleValue::Scalar`].
    Scalar,
    /// A [`StyleValue::List`].
    List,
    /// A [`StyleValue::Map`].
    Map,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scalar => "scalar",
            Self::List => "list",
            Self::Map => "map",
        };
        f.write_str(name)
    }
}

impl StyleValue {
    /// Create a scalar value.
    #[must_use]
    pub fn scalar(value: impl Into<String>) -> Self {
        Self::Scalar(value.into())
    }

    /// Create a list value.
    ///
    /// # Example
    ///
    /// ```
    /// use cf_style::StyleValue;
    ///
    /// let fonts = StyleValue::list(["ui-monospace", "monospace"]);
    /// assert_eq!(
    ///     fonts,
    ///     StyleValue::List(vec!["ui-monospace".to_owned(), "monospace".to_owned()])
    /// );
    /// ```
    #[must_use]
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Kind of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Scalar(_) => ValueKind::Scalar,
            Self::List(_) => ValueKind::List,
            Self::Map(_) => ValueKind::Map,
        }
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_owned())
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<String>> for StyleValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, StyleValue>> for StyleValue {
    fn from(map: BTreeMap<String, StyleValue>) -> Self {
        Self::Map(map)
    }
}

impl<'de> Deserialize<'de> for StyleValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(StyleValueVisitor)
    }
}

struct StyleValueVisitor;

impl<'de> Visitor<'de> for StyleValueVisitor {
    type Value = StyleValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number, boolean, list of scalars, or table")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(StyleValue::Scalar(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(StyleValue::Scalar(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(StyleValue::Scalar(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(StyleValue::Scalar(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(StyleValue::Scalar(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(StyleValue::Scalar(v))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<StyleValue>()? {
            match item {
                StyleValue::Scalar(s) => items.push(s),
                other => {
                    return Err(de::Error::custom(format!(
                        "list items must be scalars, found a {}",
                        other.kind()
                    )));
                }
            }
        }
        Ok(StyleValue::List(items))
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut map = BTreeMap::new();
        while let Some((key, value)) = access.next_entry::<String, StyleValue>()? {
            map.insert(key, value);
        }
        Ok(StyleValue::Map(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kind() {
        assert_eq!(StyleValue::scalar("1px").kind(), ValueKind::Scalar);
        assert_eq!(StyleValue::list(["a"]).kind(), ValueKind::List);
        assert_eq!(StyleValue::Map(BTreeMap::new()).kind(), ValueKind::Map);
    }

    #[test]
    fn test_deserialize_toml_table() {
        let toml = r#"
fontSize = "1rem"
lineHeight = 1.5
wrap = true
tabWidth = 4
fontFamily = ["Fira Code", "monospace"]

[frames]
titleColor = "red"
"#;
        let value: StyleValue = toml::from_str(toml).unwrap();

        let StyleValue::Map(map) = value else {
            panic!("expected map");
        };
        assert_eq!(map["fontSize"], StyleValue::scalar("1rem"));
        assert_eq!(map["lineHeight"], StyleValue::scalar("1.5"));
        assert_eq!(map["wrap"], StyleValue::scalar("true"));
        assert_eq!(map["tabWidth"], StyleValue::scalar("4"));
        assert_eq!(
            map["fontFamily"],
            StyleValue::list(["Fira Code", "monospace"])
        );
        assert_eq!(
            map["frames"],
            StyleValue::Map(BTreeMap::from([(
                "titleColor".to_owned(),
                StyleValue::scalar("red")
            )]))
        );
    }

    #[test]
    fn test_deserialize_rejects_nested_lists() {
        let result: Result<StyleValue, _> = serde_json::from_str(r#"[["a"]]"#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("list items must be scalars"), "{err}");
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ValueKind::Scalar.to_string(), "scalar");
        assert_eq!(ValueKind::List.to_string(), "list");
        assert_eq!(ValueKind::Map.to_string(), "map");
    }
}
