use serde_json::{Map, Value};

use crate::{
    entity::types::{Entity, PropertyBag},
    profile::requirements::numeric_value,
    resources::availability::Amount,
};

pub const SYSTEM_NAME_OPENSTACK: &str = "openstack";

/// How the keys of a mapping-shaped runtime property become resource names.
#[derive(Debug, Clone, Copy)]
pub struct KeyStrategy {
    /// When non-empty, the mapping is keyed by these sub-components and only
    /// their nested entries are read.
    pub components: &'static [&'static str],
    pub suppressed: &'static [&'static str],
    pub renames: &'static [(&'static str, &'static str)],
}

impl KeyStrategy {
    pub const GENERAL: KeyStrategy = KeyStrategy {
        components: &[],
        suppressed: &[],
        renames: &[],
    };

    pub const OPENSTACK: KeyStrategy = KeyStrategy {
        components: &["nova", "neutron", "cinder"],
        suppressed: &[
            "id",
            "floating_ips",
            "fixed_ips",
            "security_groups",
            "security_group_rules",
            "networks",
        ],
        renames: &[
            ("key_pairs", "keypair"),
            ("instances", "server"),
            ("volumes", "volume"),
            ("snapshots", "snapshot"),
            ("floatingip", "floating_ip"),
        ],
    };

    /// Resource name recorded for `key`, or `None` when the key is noise.
    pub fn translate(&self, key: &str) -> Option<String> {
        if self.suppressed.contains(&key) {
            return None;
        }
        let renamed = self
            .renames
            .iter()
            .find(|(from, _)| *from == key)
            .map_or(key, |(_, to)| *to);
        Some(renamed.to_string())
    }

    fn collect_mapping(&self, mapping: &Map<String, Value>, out: &mut Vec<(String, Amount)>) {
        if self.components.is_empty() {
            self.collect_flat(mapping, out);
            return;
        }

        for component in self.components {
            match mapping.get(*component) {
                Some(Value::Object(nested)) => self.collect_flat(nested, out),
                Some(other) => tracing::debug!(
                    target: "rsm.handler",
                    component = %component,
                    value = %other,
                    "component_is_not_a_mapping"
                ),
                None => {}
            }
        }
    }

    fn collect_flat(&self, mapping: &Map<String, Value>, out: &mut Vec<(String, Amount)>) {
        for (key, value) in mapping {
            let Some(number) = numeric_value(value) else {
                continue;
            };
            if let Some(resource_name) = self.translate(key) {
                out.push((resource_name, Amount::Value(number)));
            }
        }
    }
}

/// Reads the entity's designated runtime property out of `bag` and turns it
/// into `(resource_name, amount)` pairs. Unusable shapes are logged and
/// yield nothing.
pub fn extract_values(
    entity: &Entity,
    bag: &PropertyBag,
    strategy: &KeyStrategy,
) -> Vec<(String, Amount)> {
    let property_name = entity.runtime_property_name().unwrap_or_default();
    let resource_name = entity.resource_name();
    let mut values = Vec::new();

    let value = match bag.get(property_name) {
        None | Some(Value::Null) => {
            tracing::warn!(
                target: "rsm.handler",
                entity_id = %entity.id(),
                runtime_property_name = %property_name,
                "runtime_property_not_found"
            );
            return values;
        }
        Some(value) => value,
    };

    match (value, resource_name) {
        (Value::Array(items), Some(resource_name)) => {
            values.push((resource_name.to_string(), Amount::Items(items.len())));
        }
        (Value::Object(mapping), Some(resource_name)) => {
            match mapping.get(resource_name).and_then(numeric_value) {
                Some(number) => values.push((resource_name.to_string(), Amount::Value(number))),
                None => {
                    tracing::warn!(
                        target: "rsm.handler",
                        entity_id = %entity.id(),
                        runtime_property_name = %property_name,
                        resource_name = %resource_name,
                        "resource_not_numeric_in_mapping_using_keys"
                    );
                    strategy.collect_mapping(mapping, &mut values);
                }
            }
        }
        (Value::Object(mapping), None) => strategy.collect_mapping(mapping, &mut values),
        (value, Some(resource_name)) => match numeric_value(value) {
            Some(number) => values.push((resource_name.to_string(), Amount::Value(number))),
            None => log_unsupported(entity, property_name, value),
        },
        (value, None) => log_unsupported(entity, property_name, value),
    }
    values
}

fn log_unsupported(entity: &Entity, property_name: &str, value: &Value) {
    tracing::info!(
        target: "rsm.handler",
        entity_id = %entity.id(),
        runtime_property_name = %property_name,
        value = %value,
        "runtime_property_shape_not_supported"
    );
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::{KeyStrategy, extract_values};
    use crate::{
        entity::types::{Entity, PropertyBag},
        resources::availability::Amount,
    };

    fn bag(value: Value) -> PropertyBag {
        match value {
            Value::Object(map) => map,
            _ => PropertyBag::new(),
        }
    }

    fn entity(resource_name: Option<&str>) -> Entity {
        let mut properties = bag(json!({"system_name": "sys", "runtime_property_name": "q"}));
        if let Some(resource_name) = resource_name {
            properties.insert("resource_name".to_string(), json!(resource_name));
        }
        Entity::new("e1", "dep", &[], properties, PropertyBag::new()).expect("entity should build")
    }

    fn extract(resource_name: Option<&str>, value: Value) -> Vec<(String, Amount)> {
        extract_values(
            &entity(resource_name),
            &bag(json!({ "q": value })),
            &KeyStrategy::GENERAL,
        )
    }

    #[test]
    fn mapping_without_resource_name_records_numeric_entries_only() {
        assert_eq!(
            extract(None, json!({"a": 1, "b": "x"})),
            vec![("a".to_string(), Amount::Value(1.0))]
        );
    }

    #[test]
    fn scalar_with_resource_name_is_recorded_under_it() {
        assert_eq!(
            extract(Some("r"), json!(7)),
            vec![("r".to_string(), Amount::Value(7.0))]
        );
        assert_eq!(
            extract(Some("c"), json!("5")),
            vec![("c".to_string(), Amount::Value(5.0))]
        );
    }

    #[test]
    fn list_counts_its_items() {
        assert_eq!(
            extract(Some("r"), json!([1, 2, 3])),
            vec![("r".to_string(), Amount::Items(3))]
        );
    }

    #[test]
    fn zero_is_a_reading_not_an_absence() {
        assert_eq!(
            extract(Some("r"), json!(0)),
            vec![("r".to_string(), Amount::Value(0.0))]
        );
    }

    #[test]
    fn missing_or_unsupported_values_record_nothing() {
        assert!(extract(Some("r"), Value::Null).is_empty());
        assert!(extract(Some("r"), json!(true)).is_empty());
        assert!(extract(None, json!(3)).is_empty());
        assert!(extract(None, json!([1])).is_empty());
    }

    #[test]
    fn mapping_lookup_falls_back_to_keys() {
        assert_eq!(
            extract(Some("r"), json!({"r": 4, "s": 1})),
            vec![("r".to_string(), Amount::Value(4.0))]
        );
        assert_eq!(
            extract(Some("r"), json!({"s": 1})),
            vec![("s".to_string(), Amount::Value(1.0))]
        );
    }

    #[test]
    fn openstack_strategy_reads_components_and_translates() {
        let values = extract_values(
            &entity(None),
            &bag(json!({"q": {
                "nova": {"id": "abc", "instances": 10, "key_pairs": 100, "cores": 20},
                "neutron": {"floatingip": 5, "security_groups": 10, "networks": 3},
                "cinder": {"volumes": 8, "snapshots": 4},
                "glance": {"images": 50},
                "total": 1
            }})),
            &KeyStrategy::OPENSTACK,
        );

        let mut names: Vec<&str> = values.iter().map(|(name, _)| name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec!["cores", "floating_ip", "keypair", "server", "snapshot", "volume"]
        );
    }

    #[test]
    fn translate_suppresses_and_renames() {
        assert_eq!(KeyStrategy::OPENSTACK.translate("floating_ips"), None);
        assert_eq!(
            KeyStrategy::OPENSTACK.translate("key_pairs").as_deref(),
            Some("keypair")
        );
        assert_eq!(KeyStrategy::GENERAL.translate("id").as_deref(), Some("id"));
    }
}
