use std::fmt;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::debug;

const POINTS_TO_PIXELS: f32 = 4.0 / 3.0;

/// A length given either as a bare number (pixels) or as `"<n>px"` / `"<n>pt"`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Dimension {
    Px(f32),
    Pt(f32),
}

impl Dimension {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (number, make): (&str, fn(f32) -> Self) = if let Some(number) = text.strip_suffix("px")
        {
            (number, Self::Px)
        } else if let Some(number) = text.strip_suffix("pt") {
            (number, Self::Pt)
        } else {
            (text, Self::Px)
        };

        let value = number.trim().parse::<f32>().ok()?;
        value.is_finite().then(|| make(value))
    }

    pub fn to_px(self) -> f32 {
        match self {
            Self::Px(value) => value,
            Self::Pt(value) => value * POINTS_TO_PIXELS,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Px(value) => write!(f, "{value}px"),
            Self::Pt(value) => write!(f, "{value}pt"),
        }
    }
}

impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawDimension {
            Number(f64),
            Text(String),
        }

        match RawDimension::deserialize(deserializer)? {
            RawDimension::Number(value) => {
                let value = value as f32;
                if value.is_finite() {
                    Ok(Self::Px(value))
                } else {
                    Err(D::Error::custom("length out of range"))
                }
            }
            RawDimension::Text(text) => {
                Self::parse(&text).ok_or_else(|| D::Error::custom(format!("invalid length `{text}`")))
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct NodeAttributes {
    #[serde(default, alias = "radius", deserialize_with = "lenient")]
    pub r: Option<Dimension>,
    #[serde(default, deserialize_with = "lenient")]
    pub fill: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub stroke: Option<String>,
    #[serde(default, alias = "stroke_width", deserialize_with = "lenient")]
    pub strokewidth: Option<Dimension>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub font_size: Option<Dimension>,
    #[serde(default, deserialize_with = "lenient")]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub dx: Option<Dimension>,
    #[serde(default, deserialize_with = "lenient")]
    pub dy: Option<Dimension>,
    #[serde(default, deserialize_with = "lenient")]
    pub charge: Option<f32>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub group: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeAttributes {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(value @ Value::Object(_)) => Self::deserialize(value).unwrap_or_else(|error| {
                debug!(%error, "discarding node attribute payload");
                Self::default()
            }),
            Some(Value::Null) | None => Self::default(),
            Some(other) => {
                debug!(payload = %other, "node payload is not an object");
                Self::default()
            }
        }
    }

    pub fn merge(&mut self, update: Self) {
        merge_field(&mut self.r, update.r);
        merge_field(&mut self.fill, update.fill);
        merge_field(&mut self.stroke, update.stroke);
        merge_field(&mut self.strokewidth, update.strokewidth);
        merge_field(&mut self.label, update.label);
        merge_field(&mut self.font_size, update.font_size);
        merge_field(&mut self.color, update.color);
        merge_field(&mut self.dx, update.dx);
        merge_field(&mut self.dy, update.dy);
        merge_field(&mut self.charge, update.charge);
        merge_field(&mut self.group, update.group);
        merge_extra(&mut self.extra, update.extra);
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct LinkAttributes {
    #[serde(default, deserialize_with = "lenient")]
    pub stroke: Option<String>,
    #[serde(default, alias = "stroke_width", deserialize_with = "lenient")]
    pub strokewidth: Option<Dimension>,
    #[serde(default, deserialize_with = "lenient")]
    pub distance: Option<f32>,
    #[serde(default, deserialize_with = "lenient")]
    pub strength: Option<f32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LinkAttributes {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(value @ Value::Object(_)) => Self::deserialize(value).unwrap_or_else(|error| {
                debug!(%error, "discarding link attribute payload");
                Self::default()
            }),
            Some(Value::Null) | None => Self::default(),
            Some(other) => {
                debug!(payload = %other, "link payload is not an object");
                Self::default()
            }
        }
    }

    pub fn merge(&mut self, update: Self) {
        merge_field(&mut self.stroke, update.stroke);
        merge_field(&mut self.strokewidth, update.strokewidth);
        merge_field(&mut self.distance, update.distance);
        merge_field(&mut self.strength, update.strength);
        merge_extra(&mut self.extra, update.extra);
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn merge_field<T>(slot: &mut Option<T>, update: Option<T>) {
    if let Some(value) = update {
        *slot = Some(value);
    }
}

fn merge_extra(extra: &mut Map<String, Value>, update: Map<String, Value>) {
    for (key, value) in update {
        if !value.is_null() {
            extra.insert(key, value);
        }
    }
}

// A value of the wrong type for a known key counts as "not given".
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }

    match serde_json::from_value::<T>(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(error) => {
            debug!(%error, "ignoring attribute with unexpected value");
            Ok(None)
        }
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null => None,
        other => {
            debug!(value = %other, "ignoring non-scalar text attribute");
            None
        }
    })
}
