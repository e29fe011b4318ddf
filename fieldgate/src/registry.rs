//! The field registry: an immutable catalogue of field definitions.
//!
//! Built once from configuration. Keys are unique; group membership is
//! indexed up front in display order so group expansion is a lookup.

use std::collections::{BTreeMap, HashMap};

use crate::error::ConfigError;
use crate::types::FieldDefinition;

/// Immutable catalogue of field definitions, keyed by stable identifier.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    /// Definitions in registry (declaration) order
    fields: Vec<FieldDefinition>,
    /// Key to position in `fields`
    index: HashMap<String, usize>,
    /// Group name to member positions, sorted by display order
    groups: BTreeMap<String, Vec<usize>>,
}

impl FieldRegistry {
    /// Build a registry, rejecting duplicate keys.
    pub fn new(fields: Vec<FieldDefinition>) -> Result<Self, ConfigError> {
        let mut index = HashMap::with_capacity(fields.len());
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();

        for (position, field) in fields.iter().enumerate() {
            if index.insert(field.key.clone(), position).is_some() {
                return Err(ConfigError::DuplicateField(field.key.clone()));
            }
            groups.entry(field.group.clone()).or_default().push(position);
        }

        // Display order within the group, declaration order on ties
        for members in groups.values_mut() {
            members.sort_by_key(|&position| (fields[position].order, position));
        }

        Ok(Self {
            fields,
            index,
            groups,
        })
    }

    pub fn get(&self, key: &str) -> Option<&FieldDefinition> {
        self.index.get(key).map(|&position| &self.fields[position])
    }

    /// Look up a key, reporting where a missing key was referenced.
    pub fn require(&self, key: &str, location: &str) -> Result<&FieldDefinition, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::UnknownField {
            location: location.to_string(),
            field: key.to_string(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// All definitions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Names of all groups with at least one member.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    /// Members of a group in display order, or `None` for an unknown group.
    pub fn group_members(&self, group: &str) -> Option<Vec<&FieldDefinition>> {
        self.groups.get(group).map(|members| {
            members
                .iter()
                .map(|&position| &self.fields[position])
                .collect()
        })
    }

    /// Check whether `key` belongs to `group`.
    pub fn is_member(&self, group: &str, key: &str) -> bool {
        self.get(key).is_some_and(|field| field.group == group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    fn field(key: &str, group: &str, order: u32) -> FieldDefinition {
        FieldDefinition::new(key, key, DataType::String, group).order(order)
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let result = FieldRegistry::new(vec![field("a", "personal", 1), field("a", "address", 2)]);
        assert!(matches!(result, Err(ConfigError::DuplicateField(key)) if key == "a"));
    }

    #[test]
    fn test_group_members_in_display_order() {
        let registry = FieldRegistry::new(vec![
            field("last_name", "personal", 2),
            field("street", "address", 1),
            field("first_name", "personal", 1),
            field("initials", "personal", 1),
        ])
        .unwrap();

        let keys: Vec<&str> = registry
            .group_members("personal")
            .unwrap()
            .iter()
            .map(|f| f.key.as_str())
            .collect();
        assert_eq!(keys, vec!["first_name", "initials", "last_name"]);

        assert!(registry.group_members("motor").is_none());
        assert!(registry.is_member("address", "street"));
        assert!(!registry.is_member("personal", "street"));
        assert_eq!(registry.groups().collect::<Vec<_>>(), vec!["address", "personal"]);
    }

    #[test]
    fn test_require_reports_location() {
        let registry = FieldRegistry::new(vec![field("a", "g", 0)]).unwrap();
        assert!(registry.require("a", "here").is_ok());

        let err = registry.require("b", "form:x").unwrap_err();
        assert_eq!(err.to_string(), "Unknown field 'b' referenced at form:x");
    }
}
