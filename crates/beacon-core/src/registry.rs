//! Deduplicating set of discovered devices.

use std::collections::HashMap;

use crate::device::{DeviceRecord, HardwareAddress};

/// Devices seen during a session, keyed by hardware address.
///
/// The first record seen for an address is kept; later records for the same
/// address are ignored. Snapshots list devices in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryRegistry {
    records: Vec<DeviceRecord>,
    index: HashMap<HardwareAddress, usize>,
}

impl DiscoveryRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record` unless its address is already known.
    ///
    /// Returns `true` if the set of devices changed.
    pub fn upsert(&mut self, record: DeviceRecord) -> bool {
        if self.index.contains_key(record.hardware_address()) {
            return false;
        }
        self.index
            .insert(record.hardware_address().clone(), self.records.len());
        self.records.push(record);
        true
    }

    /// The current devices, for rendering.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DeviceRecord> {
        self.records.clone()
    }

    /// Forget every device.
    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }

    /// Feed back a previously saved snapshot.
    ///
    /// Saved records replace entries with the same address; new addresses are
    /// appended. Returns how many addresses were not known before.
    pub fn restore<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = DeviceRecord>,
    {
        let mut inserted = 0;
        for record in records {
            match self.index.get(record.hardware_address()) {
                Some(&position) => self.records[position] = record,
                None => {
                    self.upsert(record);
                    inserted += 1;
                }
            }
        }
        inserted
    }

    /// Look up a device by address.
    #[must_use]
    pub fn get(&self, address: &HardwareAddress) -> Option<&DeviceRecord> {
        self.index.get(address).map(|&position| &self.records[position])
    }

    /// Number of known devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` when no device has been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn record(address: &str, name: Option<&str>) -> DeviceRecord {
        DeviceRecord::new(
            HardwareAddress::new(address).unwrap(),
            name.map(str::to_string),
        )
    }

    #[test]
    fn test_upsert_inserts_new_address() {
        let mut registry = DiscoveryRegistry::new();
        assert!(registry.upsert(record("AA:BB", Some("Foo"))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_first_write_wins() {
        let mut registry = DiscoveryRegistry::new();
        assert!(registry.upsert(record("AA:BB", Some("First"))));
        assert!(!registry.upsert(record("AA:BB", Some("Second"))));

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].display_name(), "First");
    }

    #[test]
    fn test_snapshot_keeps_first_seen_order() {
        let mut registry = DiscoveryRegistry::new();
        registry.upsert(record("CC", None));
        registry.upsert(record("AA", None));
        registry.upsert(record("BB", None));

        let order: Vec<String> = registry
            .snapshot()
            .iter()
            .map(|r| r.hardware_address().to_string())
            .collect();
        assert_eq!(order, ["CC", "AA", "BB"]);
    }

    #[test]
    fn test_clear_empties_registry() {
        let mut registry = DiscoveryRegistry::new();
        registry.upsert(record("AA:BB", None));
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.upsert(record("AA:BB", None)));
    }

    #[test]
    fn test_restore_prefers_saved_records() {
        let mut registry = DiscoveryRegistry::new();
        registry.upsert(record("AA:BB", None));
        registry.upsert(record("CC:DD", Some("Live")));

        let inserted = registry.restore(vec![
            record("AA:BB", Some("Saved")),
            record("EE:FF", Some("Other")),
        ]);

        assert_eq!(inserted, 1);
        assert_eq!(registry.len(), 3);
        let aa = HardwareAddress::new("AA:BB").unwrap();
        assert_eq!(registry.get(&aa).unwrap().display_name(), "Saved");
    }

    proptest! {
        #[test]
        fn prop_addresses_stay_unique(
            entries in prop::collection::vec(("[A-F]{2}", prop::option::of("[a-z]{0,6}")), 0..64)
        ) {
            let mut registry = DiscoveryRegistry::new();
            for (address, name) in &entries {
                registry.upsert(record(address, name.as_deref()));
            }

            let snapshot = registry.snapshot();
            let unique: HashSet<_> = snapshot
                .iter()
                .map(|r| r.hardware_address().clone())
                .collect();
            prop_assert_eq!(unique.len(), snapshot.len());

            let distinct: HashSet<_> = entries.iter().map(|(a, _)| a.clone()).collect();
            prop_assert_eq!(snapshot.len(), distinct.len());
        }

        #[test]
        fn prop_upsert_is_idempotent(
            address in "[A-F0-9]{2}(:[A-F0-9]{2}){5}",
            name in prop::option::of("[a-z]{1,8}")
        ) {
            let mut registry = DiscoveryRegistry::new();
            let first = registry.upsert(record(&address, name.as_deref()));
            let second = registry.upsert(record(&address, name.as_deref()));
            prop_assert!(first);
            prop_assert!(!second);
            prop_assert_eq!(registry.len(), 1);
        }

        #[test]
        fn prop_registry_only_grows(
            addresses in prop::collection::vec("[A-F]{2}", 1..48)
        ) {
            let mut registry = DiscoveryRegistry::new();
            let mut previous = Vec::new();
            for address in &addresses {
                registry.upsert(record(address, None));
                let current = registry.snapshot();
                prop_assert!(current.len() >= previous.len());
                prop_assert_eq!(&current[..previous.len()], &previous[..]);
                previous = current;
            }
        }
    }
}
