//! Value types shared by the parser, the matcher and the profile store.
//!
//! `Display`, `Viewport` and `XrandrConnection` describe what xrandr
//! reports right now and are rebuilt on every query. `Profile`, `Output`
//! and `Rule` are the persisted side.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::orientation::Rotation;

pub const DEFAULT_PRIORITY: i32 = 100;

/// Native capabilities of the monitor attached to an output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Display {
    pub supported_modes: Vec<String>,
    pub preferred_mode: Option<String>,
    /// `None` when the display is connected but switched off.
    pub mode: Option<String>,
    pub rate: Option<String>,
    pub edid: Option<String>,
}

/// The rectangle of the virtual screen an output shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub size: String,
    pub pos: String,
    pub rotate: Rotation,
    /// `0x0` when unset, otherwise at least as large as `size`; xrandr
    /// rejects smaller panning areas.
    pub panning: String,
    pub scale: String,
}

impl Viewport {
    pub fn new(size: &str) -> Self {
        Viewport {
            size: size.to_string(),
            pos: default_pos(),
            rotate: Rotation::Normal,
            panning: default_panning(),
            scale: default_scale(),
        }
    }
}

/// An adapter output as seen in one xrandr query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XrandrConnection {
    pub name: String,
    pub display: Option<Display>,
    pub viewport: Option<Viewport>,
    pub primary: bool,
    pub crtc: Option<u32>,
}

impl XrandrConnection {
    pub fn new(name: &str) -> Self {
        XrandrConnection {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_display(name: &str, display: Display) -> Self {
        XrandrConnection {
            name: name.to_string(),
            display: Some(display),
            ..Default::default()
        }
    }

    pub fn is_connected(&self) -> bool {
        self.display.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.viewport.is_some()
    }
}

/// Per-output criterion used to auto-select a profile.
/// A rule with no criteria matches any connected output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RuleDocument")]
pub struct Rule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports: Option<String>,
}

impl Rule {
    pub fn new(edid: Option<&str>, prefers: Option<&str>, supports: Option<&str>) -> Self {
        Rule {
            edid: edid.map(str::to_string),
            prefers: prefers.map(str::to_string),
            supports: supports.map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edid.is_none() && self.prefers.is_none() && self.supports.is_none()
    }
}

#[derive(Deserialize)]
struct RuleDocument {
    edid: Option<String>,
    prefers: Option<String>,
    supports: Option<String>,
    mode: Option<String>,
}

impl From<RuleDocument> for Rule {
    fn from(doc: RuleDocument) -> Self {
        let supports = match (doc.supports, doc.mode) {
            (supports, Some(mode)) => {
                warn!("match.mode is deprecated, consider changing to 'supports' or 'prefers'");
                supports.or(Some(mode))
            }
            (supports, None) => supports,
        };
        Rule {
            edid: doc.edid,
            prefers: doc.prefers,
            supports,
        }
    }
}

/// Settings applied to one output when a profile is switched to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub mode: String,
    #[serde(default = "default_pos")]
    pub pos: String,
    #[serde(default)]
    pub rotate: Rotation,
    #[serde(default = "default_panning")]
    pub panning: String,
    #[serde(default = "default_scale")]
    pub scale: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_rate"
    )]
    pub rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crtc: Option<u32>,
}

impl Output {
    pub fn new(mode: &str) -> Self {
        Output {
            mode: mode.to_string(),
            pos: default_pos(),
            rotate: Rotation::Normal,
            panning: default_panning(),
            scale: default_scale(),
            rate: None,
            crtc: None,
        }
    }

    /// Capture what a live, active connection currently shows.
    /// Returns `None` for disconnected or inactive connections.
    pub fn from_connection(connection: &XrandrConnection) -> Option<Self> {
        let display = connection.display.as_ref()?;
        let viewport = connection.viewport.as_ref()?;
        let mode = display.mode.as_ref()?;
        Some(Output {
            mode: mode.clone(),
            pos: viewport.pos.clone(),
            rotate: viewport.rotate,
            panning: viewport.panning.clone(),
            scale: viewport.scale.clone(),
            rate: display.rate.clone(),
            crtc: connection.crtc,
        })
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.mode, self.pos.replace('x', "+"))?;
        if self.rotate != Rotation::Normal {
            write!(f, " {}", self.rotate)?;
        }
        if let Some(rate) = &self.rate {
            write!(f, " @{}", rate)?;
        }
        Ok(())
    }
}

/// A named, persisted screen configuration.
///
/// The name is not part of the document; it comes from the storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(skip)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: i32,
    pub outputs: NamedMap<Output>,
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<NamedMap<Rule>>,
}

impl Profile {
    pub fn new(name: &str, outputs: NamedMap<Output>) -> Self {
        Profile {
            name: name.to_string(),
            primary: None,
            priority: DEFAULT_PRIORITY,
            outputs,
            rules: None,
        }
    }

    /// Rules that take part in auto-matching. Empty when the profile can
    /// only be selected by name.
    pub fn match_rules(&self) -> Option<&NamedMap<Rule>> {
        self.rules.as_ref().filter(|rules| !rules.is_empty())
    }
}

fn default_pos() -> String {
    "0x0".to_string()
}

fn default_panning() -> String {
    "0x0".to_string()
}

fn default_scale() -> String {
    "1x1".to_string()
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

/// Rates show up both as `"60.00"` and as `60` in hand-written documents.
fn deserialize_rate<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawRate {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(Option::<RawRate>::deserialize(deserializer)?.map(|raw| match raw {
        RawRate::Text(s) => s,
        RawRate::Integer(i) => i.to_string(),
        RawRate::Float(f) => f.to_string(),
    }))
}

/// String-keyed map that keeps entries in insertion (document) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> NamedMap<V> {
    pub fn new() -> Self {
        NamedMap {
            entries: Vec::new(),
        }
    }

    /// Insert or replace, keeping the position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.iter_mut().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for NamedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for NamedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = NamedMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<V: Serialize> Serialize for NamedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for NamedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NamedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for NamedMapVisitor<V> {
            type Value = NamedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table keyed by output name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = NamedMap::new();
                while let Some((k, v)) = access.next_entry::<String, V>()? {
                    map.insert(k, v);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(NamedMapVisitor(PhantomData))
    }
}
