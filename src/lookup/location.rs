use serde::Serialize;
use serde_json::{Number, Value};
use std::fmt;

/// Latitude or longitude exactly as the geolocation service returned it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Coordinate {
    Number(Number),
    Text(String),
}

impl Coordinate {
    /// Accepts non-zero numbers and non-empty numeric strings, everything else means "no
    /// coordinate".
    ///
    /// Non-numeric strings and `true` are rejected too, even though they are not empty: a
    /// coordinate ends up in the path of the detail request, so only numbers may get there.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) if number.as_f64().map_or(true, |x| x != 0.0) => {
                Some(Self::Number(number.clone()))
            }
            Value::String(s) if s.parse::<f64>().map_or(false, f64::is_finite) => {
                Some(Self::Text(s.clone()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => fmt::Display::fmt(number, f),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Empty string for absent, null, false, zero and empty values.
///
/// The response only has string fields, so non-zero numbers are stringified, `true` becomes
/// `"true"`, and objects and arrays are dropped as if they were absent.
pub(crate) fn text_or_empty(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(number)) if number.as_f64().map_or(true, |x| x != 0.0) => {
            number.to_string()
        }
        Some(Value::Bool(true)) => "true".to_owned(),
        _ => String::new(),
    }
}

/// `data` member of an upstream reply. Replies are read leniently: a container of the wrong
/// type is treated like a missing one, and so are its members.
fn data(body: &Value) -> Option<&Value> {
    body.get("data")
}

/// `data.detail` of a reverse-geocoding reply.
pub(crate) fn detail_from_body(body: &Value) -> String {
    text_or_empty(data(body).and_then(|data| data.get("detail")))
}

/// Answer of the IP geolocation service.
#[derive(Debug, Clone, PartialEq)]
pub struct IpLocation {
    pub lat: Coordinate,
    pub lng: Coordinate,
    pub country: String,
    pub province: String,
    pub city: String,
    pub district: String,
}

impl IpLocation {
    /// Reads `data.{lat,lng}` and `data.rgeo.*` of a geolocation reply, `None` without
    /// usable coordinates.
    pub(crate) fn from_body(body: &Value) -> Option<Self> {
        let data = data(body)?;
        let lng = Coordinate::from_value(data.get("lng")?)?;
        let lat = Coordinate::from_value(data.get("lat")?)?;
        let rgeo = data.get("rgeo");
        let text = |name: &str| text_or_empty(rgeo.and_then(|rgeo| rgeo.get(name)));
        Some(Self {
            lat,
            lng,
            country: text("country"),
            province: text("province"),
            city: text("city"),
            district: text("district"),
        })
    }

    pub fn with_detail(self, detail: String) -> GeoLocation {
        GeoLocation {
            country: self.country,
            province: self.province,
            city: self.city,
            district: self.district,
            detail,
            lat: self.lat,
            lng: self.lng,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoLocation {
    pub country: String,
    pub province: String,
    pub city: String,
    pub district: String,
    pub detail: String,
    pub lat: Coordinate,
    pub lng: Coordinate,
}
