//! Reservation reconciliation
//!
//! Buckets running instances and active reservations by `GroupKey`
//! (instance type, placement scope, platform), then computes a signed
//! surplus/deficit per bucket:
//!
//! - positive: reserved capacity with nothing running against it
//! - negative: running instances with no reservation covering them
//!
//! Every step is a pure function from inventory records (or a previous
//! step's output) to a new immutable map, so each one can be tested alone.

use crate::provider::{InstanceRecord, InstanceState, ReservationRecord, ReservationState};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Literal scope value for region-wide buckets
pub const REGION_SCOPE: &str = "region";

/// Normalized operating system of an instance or reservation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Windows,
}

impl Platform {
    /// From an instance's OS attribute; anything unset or non-Windows is Linux
    pub fn from_instance_platform(platform: Option<&str>) -> Self {
        match platform {
            Some(p) if p.to_ascii_lowercase().contains("windows") => Platform::Windows,
            _ => Platform::Linux,
        }
    }

    /// From a reservation's product description (`Windows`, `Windows (Amazon VPC)`, ...)
    pub fn from_product_description(description: Option<&str>) -> Self {
        match description {
            Some(d) if d.contains("Windows") => Platform::Windows,
            _ => Platform::Linux,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Windows => "windows",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a bucket's capacity lives: one availability zone or the whole region
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Zone(String),
    Region,
}

impl Scope {
    pub fn is_region(&self) -> bool {
        matches!(self, Scope::Region)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Zone(zone) => f.write_str(zone),
            Scope::Region => f.write_str(REGION_SCOPE),
        }
    }
}

impl Serialize for Scope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Composite bucket key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    pub instance_type: String,
    pub scope: Scope,
    pub platform: Platform,
}

impl GroupKey {
    pub fn new(instance_type: impl Into<String>, scope: Scope, platform: Platform) -> Self {
        Self {
            instance_type: instance_type.into(),
            scope,
            platform,
        }
    }

    /// Same type and platform, scope widened to the region
    pub fn regional(&self) -> Self {
        Self {
            instance_type: self.instance_type.clone(),
            scope: Scope::Region,
            platform: self.platform,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.instance_type, self.platform, self.scope)
    }
}

/// Non-negative count per bucket
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountMap {
    counts: BTreeMap<GroupKey, u32>,
}

/// Running, non-spot instances per bucket
pub type RunningInstanceCount = CountMap;

/// Active reserved capacity per bucket
pub type ReservedCount = CountMap;

impl CountMap {
    pub fn get(&self, key: &GroupKey) -> u32 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Sum over all buckets; 0 when empty
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&c| u64::from(c)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, u32)> {
        self.counts.iter().map(|(k, &v)| (k, v))
    }

    pub fn contains_key(&self, key: &GroupKey) -> bool {
        self.counts.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Repeated keys are summed.
impl FromIterator<(GroupKey, u32)> for CountMap {
    fn from_iter<I: IntoIterator<Item = (GroupKey, u32)>>(iter: I) -> Self {
        let mut counts = BTreeMap::new();
        for (key, n) in iter {
            *counts.entry(key).or_insert(0) += n;
        }
        Self { counts }
    }
}

/// Display identifiers of qualifying instances, per bucket
///
/// Each instance appears under its zone key and under the matching region
/// key, in provider enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceNameIndex {
    names: BTreeMap<GroupKey, Vec<String>>,
}

impl InstanceNameIndex {
    pub fn names(&self, key: &GroupKey) -> &[String] {
        self.names.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names for a bucket, lexicographically sorted
    pub fn sorted_names(&self, key: &GroupKey) -> Vec<&str> {
        let mut names: Vec<&str> = self.names(key).iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn push(&mut self, key: GroupKey, name: &str) {
        self.names.entry(key).or_default().push(name.to_string());
    }
}

/// Signed reserved-minus-running per bucket
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceDiff {
    entries: BTreeMap<GroupKey, i64>,
}

impl InstanceDiff {
    pub fn get(&self, key: &GroupKey) -> Option<i64> {
        self.entries.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, i64)> {
        self.entries.iter().map(|(k, &v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_regional(&self) -> bool {
        self.entries.keys().any(|k| k.scope.is_region())
    }

    /// Buckets with surplus reservations, with the surplus
    pub fn unused(&self) -> impl Iterator<Item = (&GroupKey, u64)> {
        self.iter()
            .filter(|(_, v)| *v > 0)
            .map(|(k, v)| (k, v.unsigned_abs()))
    }

    /// Buckets with uncovered instances, with the shortfall
    pub fn unreserved(&self) -> impl Iterator<Item = (&GroupKey, u64)> {
        self.iter()
            .filter(|(_, v)| *v < 0)
            .map(|(k, v)| (k, v.unsigned_abs()))
    }

    pub fn total_unused(&self) -> u64 {
        self.unused().map(|(_, n)| n).sum()
    }
}

impl FromIterator<(GroupKey, i64)> for InstanceDiff {
    fn from_iter<I: IntoIterator<Item = (GroupKey, i64)>>(iter: I) -> Self {
        let mut entries = BTreeMap::new();
        for (key, n) in iter {
            *entries.entry(key).or_insert(0) += n;
        }
        Self { entries }
    }
}

/// Count running, non-spot instances and index their display names.
pub fn count_running_instances(
    instances: &[InstanceRecord],
) -> (RunningInstanceCount, InstanceNameIndex) {
    let mut counts: BTreeMap<GroupKey, u32> = BTreeMap::new();
    let mut index = InstanceNameIndex::default();

    for instance in instances {
        if instance.state != InstanceState::Running {
            debug!("Disqualifying instance {}: not running", instance.id);
            continue;
        }
        if instance.spot {
            debug!("Disqualifying instance {}: spot", instance.id);
            continue;
        }

        let key = GroupKey::new(
            instance.instance_type.clone(),
            Scope::Zone(instance.availability_zone.clone()),
            Platform::from_instance_platform(instance.platform.as_deref()),
        );
        *counts.entry(key.clone()).or_insert(0) += 1;

        let name = instance.display_name();
        index.push(key.regional(), name);
        index.push(key, name);
    }

    debug!("Running instances: {:?}", counts);
    (CountMap { counts }, index)
}

/// Sum active reserved capacity per bucket.
///
/// A reservation without an availability zone is treated as region-scoped.
pub fn count_reservations(reservations: &[ReservationRecord]) -> ReservedCount {
    let mut counts: BTreeMap<GroupKey, u32> = BTreeMap::new();

    for reservation in reservations {
        if reservation.state != ReservationState::Active {
            debug!(
                "Excluding reserved instances {}: no longer active",
                reservation.id
            );
            continue;
        }

        let scope = match reservation.availability_zone.as_deref() {
            Some(zone) if !zone.is_empty() => Scope::Zone(zone.to_string()),
            _ => {
                let declared = reservation.scope.as_deref().unwrap_or(REGION_SCOPE);
                if !declared.eq_ignore_ascii_case(REGION_SCOPE) {
                    debug!(
                        "Reservation {} declares scope {:?} without a zone, treating as regional",
                        reservation.id, declared
                    );
                }
                Scope::Region
            }
        };

        let key = GroupKey::new(
            reservation.instance_type.clone(),
            scope,
            Platform::from_product_description(reservation.product_description.as_deref()),
        );
        *counts.entry(key).or_insert(0) += reservation.instance_count;
    }

    debug!("Reserved instances: {:?}", counts);
    CountMap { counts }
}

/// `reserved - running` for every key in either map.
pub fn compute_diff(running: &RunningInstanceCount, reserved: &ReservedCount) -> InstanceDiff {
    let mut entries: BTreeMap<GroupKey, i64> = reserved
        .iter()
        .map(|(key, n)| (key.clone(), i64::from(n) - i64::from(running.get(key))))
        .collect();

    for (key, n) in running.iter() {
        if !reserved.contains_key(key) {
            entries.insert(key.clone(), -i64::from(n));
        }
    }

    debug!("Instance diff: {:?}", entries);
    InstanceDiff { entries }
}

/// Net region-scoped reservations against zone-level usage.
///
/// Zone buckets are rolled up to region scope per (type, platform). Rollups
/// with a matching region bucket are added into it; the rest become region
/// buckets of their own. No zone bucket survives the fold. A diff without
/// region buckets is returned unchanged.
pub fn fold_regional_reservations(diff: InstanceDiff) -> InstanceDiff {
    if !diff.has_regional() {
        return diff;
    }

    let (mut regional, zonal): (BTreeMap<_, _>, BTreeMap<_, _>) = diff
        .entries
        .into_iter()
        .partition(|(key, _)| key.scope.is_region());

    let mut rollup: BTreeMap<GroupKey, i64> = BTreeMap::new();
    for (key, n) in zonal {
        *rollup.entry(key.regional()).or_insert(0) += n;
    }

    for (key, n) in regional.iter_mut() {
        if let Some(zone_total) = rollup.remove(key) {
            *n += zone_total;
        }
    }
    regional.extend(rollup);

    debug!("Instance diff after regional fold: {:?}", regional);
    InstanceDiff { entries: regional }
}
