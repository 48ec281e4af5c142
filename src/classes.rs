//! Mapping from render-time category ids to trainer class ids.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{Error, Result};

/// One trainer class and the category id it is rendered with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntry {
    pub category_id: i64,
    pub name: String,
}

/// Ordered class table; the position of an entry is its class id.
#[derive(Debug, Clone)]
pub struct ClassMap {
    entries: Vec<ClassEntry>,
    by_category: HashMap<i64, usize>,
}

impl ClassMap {
    pub fn new(entries: Vec<ClassEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::InvalidClassMap("no classes defined".to_string()));
        }

        let mut by_category = HashMap::with_capacity(entries.len());
        for (class_id, entry) in entries.iter().enumerate() {
            if by_category.insert(entry.category_id, class_id).is_some() {
                return Err(Error::InvalidClassMap(format!(
                    "category id {} is mapped more than once",
                    entry.category_id
                )));
            }
        }

        Ok(Self {
            entries,
            by_category,
        })
    }

    /// Read a JSON array of `{"category_id": .., "name": ..}` objects
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let entries: Vec<ClassEntry> = serde_json::from_reader(BufReader::new(file))?;
        Self::new(entries)
    }

    pub fn class_id(&self, category_id: i64) -> Option<usize> {
        self.by_category.get(&category_id).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ClassMap {
    /// The four tabletop objects placed by the scene generator
    fn default() -> Self {
        let entries = [(1, "meat_can"), (2, "banana"), (3, "marker"), (4, "soup_can")]
            .into_iter()
            .map(|(category_id, name)| ClassEntry {
                category_id,
                name: name.to_string(),
            })
            .collect::<Vec<_>>();
        let by_category = entries
            .iter()
            .enumerate()
            .map(|(class_id, entry)| (entry.category_id, class_id))
            .collect();

        Self {
            entries,
            by_category,
        }
    }
}
