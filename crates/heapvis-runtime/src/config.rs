use std::str::FromStr;
use std::time::Duration;

use heapvis_graph::RootRetention;
use heapvis_layout::DotStyle;

use crate::ZoomAnchor;

/// Tunables for the reactor, snapshots and views.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Receive and send timeout on the signal channel.
    pub signal_timeout: Duration,
    /// How far the snapshot provider follows pointers from each root.
    pub traversal_depth: usize,
    /// Maximum number of snapshots kept; `None` keeps them all.
    pub history_limit: Option<usize>,
    pub zoom_anchor: ZoomAnchor,
    pub root_retention: RootRetention,
    /// Graphviz binary.
    pub dot_program: String,
    pub font: String,
    pub font_size: f64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            signal_timeout: Duration::from_millis(1000),
            traversal_depth: 100,
            history_limit: None,
            zoom_anchor: ZoomAnchor::Origin,
            root_retention: RootRetention::Reflexive,
            dot_program: "dot".to_string(),
            font: "Helvetica".to_string(),
            font_size: 10.0,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by any `HEAPVIS_*` variables that are set.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();
        if let Some(ms) = parsed::<u64>(&lookup, "HEAPVIS_SIGNAL_TIMEOUT_MS")? {
            config.signal_timeout = Duration::from_millis(ms);
        }
        if let Some(depth) = parsed(&lookup, "HEAPVIS_TRAVERSAL_DEPTH")? {
            config.traversal_depth = depth;
        }
        if let Some(limit) = parsed::<usize>(&lookup, "HEAPVIS_HISTORY_LIMIT")? {
            config.history_limit = (limit > 0).then_some(limit);
        }
        if let Some(anchor) = parsed(&lookup, "HEAPVIS_ZOOM_ANCHOR")? {
            config.zoom_anchor = anchor;
        }
        if let Some(retention) = parsed(&lookup, "HEAPVIS_ROOT_RETENTION")? {
            config.root_retention = retention;
        }
        if let Some(program) = lookup("HEAPVIS_DOT") {
            config.dot_program = program;
        }
        if let Some(font) = lookup("HEAPVIS_FONT") {
            config.font = font;
        }
        if let Some(size) = parsed::<f64>(&lookup, "HEAPVIS_FONT_SIZE")? {
            if size.is_nan() || size <= 0.0 {
                return Err(format!("HEAPVIS_FONT_SIZE must be positive, got {size}"));
            }
            config.font_size = size;
        }
        Ok(config)
    }

    pub fn dot_style(&self) -> DotStyle {
        DotStyle::new(self.font.clone(), self.font_size)
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("{key}={raw:?}: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = RuntimeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.signal_timeout, Duration::from_secs(1));
        assert_eq!(config.history_limit, None);
    }

    #[test]
    fn variables_override_defaults() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("HEAPVIS_SIGNAL_TIMEOUT_MS", "250"),
            ("HEAPVIS_TRAVERSAL_DEPTH", "12"),
            ("HEAPVIS_HISTORY_LIMIT", "5"),
            ("HEAPVIS_ZOOM_ANCHOR", "pointer"),
            ("HEAPVIS_ROOT_RETENTION", "downstream"),
            ("HEAPVIS_DOT", "/opt/graphviz/bin/dot"),
            ("HEAPVIS_FONT_SIZE", "14"),
        ]))
        .unwrap();
        assert_eq!(config.signal_timeout, Duration::from_millis(250));
        assert_eq!(config.traversal_depth, 12);
        assert_eq!(config.history_limit, Some(5));
        assert_eq!(config.zoom_anchor, ZoomAnchor::Pointer);
        assert_eq!(config.root_retention, RootRetention::Downstream);
        assert_eq!(config.dot_program, "/opt/graphviz/bin/dot");
        assert_eq!(config.dot_style().font_size, 14.0);
    }

    #[test]
    fn zero_history_limit_means_unbounded() {
        let config = RuntimeConfig::from_lookup(lookup(&[("HEAPVIS_HISTORY_LIMIT", "0")])).unwrap();
        assert_eq!(config.history_limit, None);
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = RuntimeConfig::from_lookup(lookup(&[("HEAPVIS_TRAVERSAL_DEPTH", "deep")]))
            .unwrap_err();
        assert!(err.starts_with("HEAPVIS_TRAVERSAL_DEPTH="), "{err}");
        assert!(RuntimeConfig::from_lookup(lookup(&[("HEAPVIS_FONT_SIZE", "-2")])).is_err());
    }
}
