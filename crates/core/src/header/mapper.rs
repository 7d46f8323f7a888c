//! Normalized-name -> canonical-header mapping with staleness tracking.
//!
//! [`HeaderMap`] is an immutable snapshot built from one header row.
//! [`HeaderMapper`] owns the current snapshot for a single worksheet and
//! swaps in a new one only when the live header row changes, so
//! rows created from the same snapshot keep sharing one `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::normalize::normalize;
use crate::config::{CollisionPolicy, MapperConfig};
use crate::errors::HeaderError;

/// Normalized names the row facade uses for its own members. Headers that
/// normalize to one of these are still mapped, but are not projected as
/// row fields.
pub const RESERVED_FIELDS: &[&str] = &[
    "id",
    "save",
    "del",
    "tojson",
    "worksheet",
    "spreadsheet",
    "v3",
];

/// Mapping from normalized key to canonical header, in first-insertion
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    /// (normalized key, canonical header) pairs.
    entries: Vec<(String, String)>,
    /// normalized key -> position in `entries`.
    index: HashMap<String, usize>,
    /// Every header the map was built from, including unmappable and
    /// duplicate ones.
    source: Vec<String>,
}

impl HeaderMap {
    /// Build a map from a header row.
    ///
    /// Empty headers and headers with an empty normalized form are skipped.
    /// When two headers share a key the later one wins, unless `policy` is
    /// [`CollisionPolicy::Reject`].
    pub fn build<S: AsRef<str>>(
        headers: &[S],
        policy: CollisionPolicy,
    ) -> Result<Self, HeaderError> {
        let mut map = Self {
            source: headers.iter().map(|h| h.as_ref().to_string()).collect(),
            ..Self::default()
        };

        for header in headers.iter().map(AsRef::as_ref) {
            let key = normalize(header);
            if header.is_empty() || key.is_empty() {
                continue;
            }

            match map.index.get(&key).copied() {
                None => {
                    map.index.insert(key.clone(), map.entries.len());
                    map.entries.push((key, header.to_string()));
                }
                Some(pos) => {
                    let previous = &map.entries[pos].1;
                    if previous != header {
                        match policy {
                            CollisionPolicy::LastWins => {}
                            CollisionPolicy::Warn => warn!(
                                key = %key,
                                replaced = %previous,
                                header,
                                "header collision, keeping the later header"
                            ),
                            CollisionPolicy::Reject => {
                                return Err(HeaderError::Collision {
                                    key,
                                    first: previous.clone(),
                                    second: header.to_string(),
                                })
                            }
                        }
                    }
                    map.entries[pos].1 = header.to_string();
                }
            }
        }

        Ok(map)
    }

    /// `true` if `headers` differs from the header row this map was built
    /// from. Any change counts, including a case-only one, since the
    /// canonical header is what row values are keyed by.
    pub fn is_stale_for<S: AsRef<str>>(&self, headers: &[S]) -> bool {
        self.source.len() != headers.len()
            || self
                .source
                .iter()
                .zip(headers)
                .any(|(known, live)| known != live.as_ref())
    }

    /// Canonical header for an already-normalized key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.index.get(key).map(|&pos| self.entries[pos].1.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// (normalized key, canonical header) pairs in map order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|(k, h)| (k.as_str(), h.as_str()))
    }

    /// Resolve any spelling of a field name to its canonical header.
    ///
    /// Names whose normalized form is not in the map are returned as-is so
    /// that non-column fields pass through untouched.
    pub fn translate<'a>(&'a self, raw: &'a str) -> &'a str {
        self.lookup(raw).unwrap_or(raw)
    }

    /// Canonical header for any spelling of a field name, if it maps.
    pub fn lookup(&self, raw: &str) -> Option<&str> {
        self.get(&normalize(raw))
    }

    /// Normalized keys a row facade exposes as fields.
    pub fn project_fields(&self) -> Vec<&str> {
        self.keys()
            .filter(|key| !RESERVED_FIELDS.contains(key))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Cached rebuild
// ---------------------------------------------------------------------------

/// Result of [`rebuild_if_stale`].
#[derive(Debug, Clone)]
pub struct Refresh {
    /// The map to use from now on.
    pub map: Arc<HeaderMap>,
    /// `false` when `map` is the unchanged input snapshot.
    pub rebuilt: bool,
}

/// Return `current` if it still matches `headers`, otherwise build a new
/// map from `headers`.
pub fn rebuild_if_stale<S: AsRef<str>>(
    headers: &[S],
    current: &Arc<HeaderMap>,
    policy: CollisionPolicy,
) -> Result<Refresh, HeaderError> {
    if !current.is_stale_for(headers) {
        debug!(columns = current.len(), "header map is current");
        return Ok(Refresh {
            map: Arc::clone(current),
            rebuilt: false,
        });
    }

    let map = HeaderMap::build(headers, policy)?;
    debug!(
        headers = headers.len(),
        columns = map.len(),
        "rebuilt header map"
    );
    Ok(Refresh {
        map: Arc::new(map),
        rebuilt: true,
    })
}

/// Owner of the current [`HeaderMap`] for one worksheet.
#[derive(Debug, Default)]
pub struct HeaderMapper {
    current: Arc<HeaderMap>,
    policy: CollisionPolicy,
    rebuilds: u64,
}

impl HeaderMapper {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn from_config(config: &MapperConfig) -> Self {
        Self::new(config.collision_policy)
    }

    /// Bring the map in line with `headers`, rebuilding only if needed.
    ///
    /// On error the previous map stays in place.
    pub fn rebuild_if_stale<S: AsRef<str>>(
        &mut self,
        headers: &[S],
    ) -> Result<Arc<HeaderMap>, HeaderError> {
        let refresh = rebuild_if_stale(headers, &self.current, self.policy)?;
        if refresh.rebuilt {
            self.rebuilds += 1;
            self.current = Arc::clone(&refresh.map);
        }
        Ok(refresh.map)
    }

    /// The current snapshot (empty until the first rebuild).
    pub fn current(&self) -> Arc<HeaderMap> {
        Arc::clone(&self.current)
    }

    pub fn map(&self) -> &HeaderMap {
        &self.current
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    /// Number of times a new map has been built.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Shorthand for [`HeaderMap::translate`] on the current map.
    pub fn translate<'a>(&'a self, raw: &'a str) -> &'a str {
        self.current.translate(raw)
    }
}
