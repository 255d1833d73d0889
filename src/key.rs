#[cfg(not(feature = "std"))]
use alloc::collections::{BTreeMap, BTreeSet};
#[cfg(feature = "std")]
use std::collections::{HashMap, HashSet};

#[cfg(feature = "std")]
pub(crate) type KeyMap<K, V> = HashMap<K, V>;
#[cfg(not(feature = "std"))]
pub(crate) type KeyMap<K, V> = BTreeMap<K, V>;

/// The set type used for expanded node ids.
///
/// `HashSet` with `std`, `BTreeSet` otherwise.
#[cfg(feature = "std")]
pub type KeySet<K> = HashSet<K>;
#[cfg(not(feature = "std"))]
pub type KeySet<K> = BTreeSet<K>;
