use std::collections::BTreeMap;

use crate::core::model::Category;

/// Running number of drawn markers per category for one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorCounts {
    counts: [usize; 3],
}

impl ErrorCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, category: Category) {
        self.counts[category.index()] += 1;
    }

    pub fn get(&self, category: Category) -> usize {
        self.counts[category.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, usize)> + '_ {
        Category::ALL.iter().map(move |&category| (category, self.get(category)))
    }

    pub fn to_map(&self) -> BTreeMap<Category, usize> {
        self.iter().collect()
    }
}
