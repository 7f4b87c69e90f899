use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Wire sentinel for an unoccupied slot. The simulation sends it as the integer `0`.
pub const EMPTY_CODE: &str = "0";

/// Opaque paint identifier as sent by the simulation ("C1".."C12" or the empty sentinel).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColorCode(String);

impl ColorCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn empty() -> Self {
        Self(EMPTY_CODE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty_slot(&self) -> bool {
        self.0.trim() == EMPTY_CODE
    }
}

impl fmt::Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ColorCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Serialize for ColorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.is_empty_slot() {
            serializer.serialize_u64(0)
        } else {
            serializer.serialize_str(&self.0)
        }
    }
}

/// Codes arrive either as strings or as bare integers (the empty sentinel).
impl<'de> Deserialize<'de> for ColorCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let val = Value::deserialize(deserializer)?;
        match val {
            Value::String(s) => Ok(ColorCode(s)),
            Value::Number(n) if n.as_f64() == Some(0.0) => Ok(ColorCode::empty()),
            Value::Number(n) => Ok(ColorCode(n.to_string())),
            _ => Err(serde::de::Error::custom(
                "expected string or number for color code",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorInfo {
    pub name: &'static str,
    pub rgb: Rgb,
}

impl ColorInfo {
    const fn new(name: &'static str, rgb: Rgb) -> Self {
        Self { name, rgb }
    }

    pub fn hex(&self) -> String {
        self.rgb.hex()
    }
}

/// Neutral gray used for codes the registry does not know.
pub const UNKNOWN_COLOR: ColorInfo = ColorInfo::new("Unknown", Rgb(0x9C, 0xA3, 0xAF));
/// Placeholder for "no color selected yet" on the conveyor.
pub const NO_COLOR: ColorInfo = ColorInfo::new("None", Rgb(0x6B, 0x72, 0x80));

const REGISTRY: [(&str, ColorInfo); 13] = [
    ("C1", ColorInfo::new("Red", Rgb(0xEF, 0x44, 0x44))),
    ("C2", ColorInfo::new("Green", Rgb(0x10, 0xB9, 0x81))),
    ("C3", ColorInfo::new("Blue", Rgb(0x3B, 0x82, 0xF6))),
    ("C4", ColorInfo::new("Yellow", Rgb(0xEA, 0xB3, 0x08))),
    ("C5", ColorInfo::new("Orange", Rgb(0xF9, 0x73, 0x16))),
    ("C6", ColorInfo::new("Purple", Rgb(0xA8, 0x55, 0xF7))),
    ("C7", ColorInfo::new("Pink", Rgb(0xEC, 0x48, 0x99))),
    ("C8", ColorInfo::new("Brown", Rgb(0x92, 0x40, 0x0E))),
    ("C9", ColorInfo::new("Cyan", Rgb(0x06, 0xB6, 0xD4))),
    ("C10", ColorInfo::new("Magenta", Rgb(0xD9, 0x46, 0xEF))),
    ("C11", ColorInfo::new("Lime", Rgb(0x84, 0xCC, 0x16))),
    ("C12", ColorInfo::new("Gray", Rgb(0x9C, 0xA3, 0xAF))),
    (EMPTY_CODE, ColorInfo::new("Empty", Rgb(0x37, 0x41, 0x51))),
];

pub fn lookup(code: &str) -> Option<ColorInfo> {
    let normalized = code.trim().to_ascii_uppercase();
    REGISTRY
        .iter()
        .find(|(key, _)| *key == normalized)
        .map(|(_, info)| *info)
}

/// Total resolution: every code maps to something drawable.
pub fn resolve(code: &ColorCode) -> ColorInfo {
    lookup(code.as_str()).unwrap_or(UNKNOWN_COLOR)
}

pub fn resolve_current(code: Option<&ColorCode>) -> ColorInfo {
    code.map(resolve).unwrap_or(NO_COLOR)
}

pub fn registry() -> impl Iterator<Item = (&'static str, ColorInfo)> {
    REGISTRY.iter().copied()
}
