use rustc_hash::FxHashMap;

use crate::source::ObjectKey;

/// How a shape's geometry is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Mesh,
    Skinned,
    MergeGroup,
    MergeChildren,
}

/// One entry of the file's shape table.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeRecord {
    pub id: u32,
    pub name: String,
    pub kind: ShapeKind,
    /// Source objects whose geometry makes up the shape.
    pub objects: Vec<ObjectKey>,
}

/// Shapes by name. Objects sharing a mesh share one entry.
#[derive(Debug, Clone, Default)]
pub struct ShapeTable {
    shapes: Vec<ShapeRecord>,
    by_name: FxHashMap<String, u32>,
}

impl ShapeTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of the shape called `name`, adding it first if needed.
    /// Shape ids start at 1.
    pub fn add_or_get(&mut self, name: &str, kind: ShapeKind, objects: Vec<ObjectKey>) -> u32 {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = u32::try_from(self.shapes.len()).unwrap_or(u32::MAX - 1) + 1;
        self.shapes.push(ShapeRecord {
            id,
            name: name.to_owned(),
            kind,
            objects,
        });
        self.by_name.insert(name.to_owned(), id);
        id
    }

    #[must_use]
    pub fn get(&self, id: u32) -> Option<&ShapeRecord> {
        let index = usize::try_from(id.checked_sub(1)?).ok()?;
        self.shapes.get(index)
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ShapeRecord> {
        self.by_name.get(name).and_then(|&id| self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShapeRecord> {
        self.shapes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_names_share_ids() {
        let mut table = ShapeTable::new();
        let a = table.add_or_get("Cube", ShapeKind::Mesh, vec![]);
        let b = table.add_or_get("Wheel", ShapeKind::Mesh, vec![]);
        assert_eq!((a, b), (1, 2));
        assert_eq!(table.add_or_get("Cube", ShapeKind::Mesh, vec![]), 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(2).map(|s| s.name.as_str()), Some("Wheel"));
    }
}
