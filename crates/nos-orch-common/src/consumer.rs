//! Consumer of configuration-bus table entries.

use std::collections::{BTreeMap, VecDeque};

/// Operation type of a bus record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Set operation (add or update)
    Set,
    /// Delete operation
    Del,
}

impl Operation {
    /// Returns true if this is a Set operation.
    pub fn is_set(&self) -> bool {
        matches!(self, Operation::Set)
    }

    /// Returns true if this is a Del operation.
    pub fn is_del(&self) -> bool {
        matches!(self, Operation::Del)
    }
}

/// A field-value pair of a bus record.
pub type FieldValue = (String, String);

/// Key, operation, and field-values tuple from the bus.
#[derive(Debug, Clone)]
pub struct KeyOpFieldsValues {
    /// The key (e.g., "Ethernet0:10.0.0.1/24")
    pub key: String,
    /// The operation (Set or Del)
    pub op: Operation,
    /// Field-value pairs (empty for Del operations)
    pub fvs: Vec<FieldValue>,
}

impl KeyOpFieldsValues {
    /// Creates a new entry.
    pub fn new(key: impl Into<String>, op: Operation, fvs: Vec<FieldValue>) -> Self {
        Self {
            key: key.into(),
            op,
            fvs,
        }
    }

    /// Creates a Set entry.
    pub fn set(key: impl Into<String>, fvs: Vec<FieldValue>) -> Self {
        Self::new(key, Operation::Set, fvs)
    }

    /// Creates a Del entry.
    pub fn del(key: impl Into<String>) -> Self {
        Self::new(key, Operation::Del, vec![])
    }

    /// Returns the value for a field, if present.
    pub fn get_field(&self, field: &str) -> Option<&str> {
        self.fvs
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if this entry has the given field.
    pub fn has_field(&self, field: &str) -> bool {
        self.fvs.iter().any(|(f, _)| f == field)
    }
}

/// Configuration for a Consumer.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Table name (e.g., "INTF_TABLE")
    pub table_name: String,
    /// Priority (lower = higher priority)
    pub priority: i32,
}

impl ConsumerConfig {
    /// Creates a new consumer config.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            priority: 0,
        }
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Ordered per-key pending map between the bus and an orchestration agent.
///
/// The agent drains pending entries, processes each, and calls
/// [`Consumer::retry`] for anything that must stay pending ("defer" in the
/// event-source contract). Deduplication on ingest:
///
/// - a later SET for a key merges its field-values into a pending SET;
/// - a DEL clears pending operations for the key and replaces them;
/// - DEL followed by SET keeps both, in order.
pub struct Consumer {
    config: ConsumerConfig,
    /// Pending tasks indexed by key
    to_sync: BTreeMap<String, VecDeque<KeyOpFieldsValues>>,
    /// Total count of pending entries
    pending_count: usize,
}

impl Consumer {
    /// Creates a new consumer with the given configuration.
    pub fn new(config: ConsumerConfig) -> Self {
        Self {
            config,
            to_sync: BTreeMap::new(),
            pending_count: 0,
        }
    }

    /// Returns the table name.
    pub fn table_name(&self) -> &str {
        &self.config.table_name
    }

    /// Returns the priority.
    pub fn priority(&self) -> i32 {
        self.config.priority
    }

    /// Returns true if there are pending entries.
    pub fn has_pending(&self) -> bool {
        self.pending_count > 0
    }

    /// Returns the number of pending entries.
    pub fn pending_count(&self) -> usize {
        self.pending_count
    }

    /// Adds entries to the pending map with deduplication.
    pub fn add_to_sync(&mut self, entries: Vec<KeyOpFieldsValues>) {
        for entry in entries {
            self.add_single_entry(entry);
        }
    }

    fn add_single_entry(&mut self, entry: KeyOpFieldsValues) {
        let queue = self.to_sync.entry(entry.key.clone()).or_default();

        match entry.op {
            Operation::Del => {
                // DEL clears any pending operations and replaces them
                if !queue.is_empty() {
                    self.pending_count -= queue.len();
                    queue.clear();
                }
                queue.push_back(entry);
                self.pending_count += 1;
            }
            Operation::Set => {
                // SET merges into a pending SET, newer values override
                if let Some(last) = queue.back_mut() {
                    if last.op == Operation::Set {
                        for (field, value) in entry.fvs {
                            if let Some(existing) = last.fvs.iter_mut().find(|(f, _)| *f == field) {
                                existing.1 = value;
                            } else {
                                last.fvs.push((field, value));
                            }
                        }
                        return;
                    }
                }
                queue.push_back(entry);
                self.pending_count += 1;
            }
        }
    }

    /// Drains all pending entries in key order.
    pub fn drain(&mut self) -> Vec<KeyOpFieldsValues> {
        let mut result = Vec::with_capacity(self.pending_count);

        for (_key, mut queue) in std::mem::take(&mut self.to_sync) {
            while let Some(entry) = queue.pop_front() {
                result.push(entry);
            }
        }

        self.pending_count = 0;
        result
    }

    /// Re-adds an entry to the pending map, to be retried on the next drain.
    pub fn retry(&mut self, entry: KeyOpFieldsValues) {
        let queue = self.to_sync.entry(entry.key.clone()).or_default();
        queue.push_front(entry);
        self.pending_count += 1;
    }

    /// Dumps pending entries for debugging.
    pub fn dump(&self) -> Vec<String> {
        self.to_sync
            .iter()
            .flat_map(|(key, queue)| {
                queue.iter().map(move |e| {
                    format!(
                        "{}: {} {:?}",
                        key,
                        if e.op.is_set() { "SET" } else { "DEL" },
                        e.fvs
                    )
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_key_op_fields_values() {
        let entry = KeyOpFieldsValues::set(
            "Ethernet0:10.0.0.1/24",
            vec![("scope".to_string(), "global".to_string())],
        );

        assert_eq!(entry.key, "Ethernet0:10.0.0.1/24");
        assert!(entry.op.is_set());
        assert_eq!(entry.get_field("scope"), Some("global"));
        assert!(!entry.has_field("family"));
    }

    #[test]
    fn test_set_merge() {
        let mut consumer = Consumer::new(ConsumerConfig::new("INTF_TABLE"));

        consumer.add_to_sync(vec![KeyOpFieldsValues::set(
            "Ethernet0:10.0.0.1/24",
            vec![("scope".to_string(), "local".to_string())],
        )]);
        consumer.add_to_sync(vec![KeyOpFieldsValues::set(
            "Ethernet0:10.0.0.1/24",
            vec![
                ("scope".to_string(), "global".to_string()),
                ("family".to_string(), "IPv4".to_string()),
            ],
        )]);

        assert_eq!(consumer.pending_count(), 1);

        let entries = consumer.drain();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].get_field("scope"), Some("global"));
        assert_eq!(entries[0].get_field("family"), Some("IPv4"));
    }

    #[test]
    fn test_del_clears_pending_set() {
        let mut consumer = Consumer::new(ConsumerConfig::new("INTF_TABLE"));

        consumer.add_to_sync(vec![KeyOpFieldsValues::set("Ethernet0:10.0.0.1/24", vec![])]);
        consumer.add_to_sync(vec![KeyOpFieldsValues::del("Ethernet0:10.0.0.1/24")]);

        assert_eq!(consumer.pending_count(), 1);
        let entries = consumer.drain();
        assert!(entries[0].op.is_del());
    }

    #[test]
    fn test_del_then_set_keeps_order() {
        let mut consumer = Consumer::new(ConsumerConfig::new("INTF_TABLE"));

        consumer.add_to_sync(vec![KeyOpFieldsValues::del("Ethernet0:10.0.0.1/24")]);
        consumer.add_to_sync(vec![KeyOpFieldsValues::set("Ethernet0:10.0.0.1/24", vec![])]);

        let entries = consumer.drain();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].op.is_del());
        assert!(entries[1].op.is_set());
    }

    #[test]
    fn test_retry_survives_drain() {
        let mut consumer = Consumer::new(ConsumerConfig::new("INTF_TABLE"));

        consumer.add_to_sync(vec![KeyOpFieldsValues::set("Ethernet0:10.0.0.1/24", vec![])]);
        let entries = consumer.drain();
        assert!(!consumer.has_pending());

        consumer.retry(entries[0].clone());
        assert_eq!(consumer.pending_count(), 1);
        assert_eq!(consumer.drain().len(), 1);
    }
}
