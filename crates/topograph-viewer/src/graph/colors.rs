use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::util::config::{ConfigError, ViewerConfig, DEFAULT_PALETTE};
use crate::util::ids::host_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub [u8; 3]);

impl FromStr for Color {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ConfigError::InvalidColor(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(bad)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(bad());
        }
        let mut rgb = [0u8; 3];
        for (i, chan) in rgb.iter_mut().enumerate() {
            *chan = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| bad())?;
        }
        Ok(Self(rgb))
    }
}

impl TryFrom<String> for Color {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

#[derive(Default)]
struct Assignments {
    by_host: HashMap<String, Color>,
    order: Vec<String>,
    counter: usize,
}

/// Session-scoped host -> color mapping.
///
/// Built once by the composition root and shared as `Rc<ColorAssignmentService>`;
/// colors are handed out in first-seen order, cycling through the palette, and
/// never change afterwards.
pub struct ColorAssignmentService {
    palette: Vec<Color>,
    default_key: String,
    inner: RefCell<Assignments>,
}

impl ColorAssignmentService {
    pub fn new(palette: Vec<Color>, default_key: impl Into<String>) -> Self {
        let palette = if palette.is_empty() {
            DEFAULT_PALETTE
                .iter()
                .filter_map(|c| c.parse().ok())
                .collect()
        } else {
            palette
        };
        Self {
            palette,
            default_key: default_key.into(),
            inner: RefCell::new(Assignments::default()),
        }
    }

    pub fn from_config(cfg: &ViewerConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(cfg.palette_colors()?, cfg.default_host_key.clone()))
    }

    pub fn color_for(&self, hostname: Option<&str>) -> Color {
        let key = host_key(hostname, &self.default_key);
        let mut inner = self.inner.borrow_mut();
        if let Some(c) = inner.by_host.get(key) {
            return *c;
        }
        let color = self.palette[inner.counter % self.palette.len()];
        inner.counter += 1;
        inner.by_host.insert(key.to_string(), color);
        inner.order.push(key.to_string());
        color
    }

    /// Every assigned host with its color, in first-seen order.
    pub fn host_legend(&self) -> Vec<(String, Color)> {
        let inner = self.inner.borrow();
        inner
            .order
            .iter()
            .filter_map(|h| inner.by_host.get(h).map(|c| (h.clone(), *c)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette(n: usize) -> Vec<Color> {
        (0..n).map(|i| Color([i as u8, 0, 0])).collect()
    }

    #[test]
    fn colors_follow_first_seen_order_and_cycle() {
        let svc = ColorAssignmentService::new(palette(2), "unknown");
        assert_eq!(svc.color_for(Some("vm1")), Color([0, 0, 0]));
        assert_eq!(svc.color_for(Some("vm2")), Color([1, 0, 0]));
        assert_eq!(svc.color_for(Some("vm3")), Color([0, 0, 0]));
        assert_eq!(svc.color_for(Some("vm2")), Color([1, 0, 0]));
        assert_eq!(svc.host_legend().len(), 3);
    }

    #[test]
    fn missing_hostnames_share_one_entry() {
        let svc = ColorAssignmentService::new(palette(3), "unknown");
        let a = svc.color_for(None);
        let b = svc.color_for(Some(""));
        assert_eq!(a, b);
        assert_eq!(svc.host_legend(), vec![("unknown".to_string(), a)]);
    }

    #[test]
    fn hex_parse_and_display() {
        let c: Color = "#0A1b2C".parse().expect("color");
        assert_eq!(c, Color([0x0a, 0x1b, 0x2c]));
        assert_eq!(c.to_string(), "#0a1b2c");
        assert!("0a1b2c".parse::<Color>().is_err());
        assert!("#0a1b2".parse::<Color>().is_err());
        assert!("#zz1b2c".parse::<Color>().is_err());
    }

    #[test]
    fn empty_palette_falls_back_to_builtin() {
        let svc = ColorAssignmentService::new(Vec::new(), "unknown");
        assert_eq!(svc.color_for(Some("vm1")).to_string(), DEFAULT_PALETTE[0]);
    }
}
