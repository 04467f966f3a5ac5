//! Category filter applied to candidate pools before truncation

use crate::types::Article;

/// Case-insensitive substring match against category or subcategory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryFilter {
    needle: Option<String>,
}

impl CategoryFilter {
    /// `None`, blank and `"all"` disable filtering
    pub fn new(category: Option<&str>) -> Self {
        let needle = category
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty() && c != "all");
        Self { needle }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.needle.is_some()
    }

    pub fn matches(&self, article: &Article) -> bool {
        match &self.needle {
            None => true,
            Some(needle) => {
                article.category.to_lowercase().contains(needle.as_str())
                    || article.subcategory.to_lowercase().contains(needle.as_str())
            }
        }
    }
}
