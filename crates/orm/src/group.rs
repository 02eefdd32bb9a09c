use std::collections::HashMap;

use crate::params::EntityParameter;

/// Batch items sharing one exact set of present columns.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeGroup {
    /// The shared columns, sorted.
    pub columns: Vec<String>,

    /// Items in input order.
    pub items: Vec<EntityParameter>,
}

/// Canonical shape key of an item: its sorted column names.
#[must_use]
pub fn shape_key(item: &EntityParameter) -> String {
    item.sorted_columns().join(",")
}

/// Group items by shape. Groups are ordered by the first appearance of their
/// shape and keep their items' relative order.
#[must_use]
pub fn group_by_shape(items: Vec<EntityParameter>) -> Vec<ShapeGroup> {
    let mut groups: Vec<ShapeGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let key = shape_key(&item);
        if let Some(&pos) = index.get(&key) {
            groups[pos].items.push(item);
        } else {
            index.insert(key, groups.len());
            groups.push(ShapeGroup {
                columns: item.sorted_columns().into_iter().map(ToString::to_string).collect(),
                items: vec![item],
            });
        }
    }
    groups
}
