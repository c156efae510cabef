// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::PropertyValue;
use std::collections::BTreeMap;

/// An index-aligned sequence of scalars, one per feature row id.
///
/// The block equivalent of a dataframe column: values are keyed by the row
/// id of the feature frame they were derived from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    values: BTreeMap<i64, PropertyValue>,
}

impl Series {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn insert(&mut self, id: i64, value: PropertyValue) {
        self.values.insert(id, value);
    }

    pub fn get(&self, id: i64) -> Option<&PropertyValue> {
        self.values.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &PropertyValue)> {
        self.values.iter().map(|(id, v)| (*id, v))
    }
}

impl FromIterator<(i64, PropertyValue)> for Series {
    fn from_iter<T: IntoIterator<Item = (i64, PropertyValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
