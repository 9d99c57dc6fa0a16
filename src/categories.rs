use crate::entities::TrackerCategory;
use crate::error::{StoreError, StoreResult};
use crate::observe::{Subscribers, SubscriptionId};
use crate::store::{CategoryStore, StoreChange};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

/// Backs the category picker used when creating or editing a tracker.
pub struct CategoriesModel {
    store: Arc<dyn CategoryStore>,
    changes: Receiver<StoreChange>,
    categories: Vec<TrackerCategory>,
    subscribers: Subscribers<Vec<TrackerCategory>>,
    selection: Subscribers<TrackerCategory>,
}

impl CategoriesModel {
    pub fn new(store: Arc<dyn CategoryStore>) -> Self {
        let (sender, changes) = mpsc::channel();
        store.subscribe(sender);
        let categories = store.fetch_all().unwrap_or_else(|error| {
            tracing::warn!(error = %error, "failed to load categories");
            Vec::new()
        });
        Self {
            store,
            changes,
            categories,
            subscribers: Subscribers::new(),
            selection: Subscribers::new(),
        }
    }

    /// Every stored category, sorted by title.
    pub fn categories(&self) -> &[TrackerCategory] {
        &self.categories
    }

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&Vec<TrackerCategory>) + 'static,
    ) -> SubscriptionId {
        self.subscribers.subscribe(&self.categories, listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Remove a listener registered with [`CategoriesModel::on_select`].
    pub fn unsubscribe_selection(&mut self, id: SubscriptionId) -> bool {
        self.selection.unsubscribe(id)
    }

    /// Listen for picks made through [`CategoriesModel::select_category`].
    pub fn on_select(
        &mut self,
        listener: impl FnMut(&TrackerCategory) + 'static,
    ) -> SubscriptionId {
        self.selection.listen(listener)
    }

    /// Pick the category at `index` in the current list and announce it.
    pub fn select_category(&mut self, index: usize) -> Option<TrackerCategory> {
        let category = self.categories.get(index)?.clone();
        self.selection.publish(&category);
        Some(category)
    }

    /// Create an empty category. Creating a title that already exists is a no-op.
    pub fn create_category(&mut self, title: &str) -> StoreResult<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StoreError::InvalidCategory("empty category title".to_string()));
        }
        self.store.create(title)?;
        self.refresh();
        Ok(())
    }

    /// Drain category notifications and reload if anything changed.
    pub fn refresh(&mut self) -> bool {
        if self.changes.try_iter().count() == 0 {
            return false;
        }
        match self.store.fetch_all() {
            Ok(categories) => {
                self.categories = categories;
                self.subscribers.publish(&self.categories);
                true
            }
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    "failed to reload categories, keeping previous list"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn model() -> (MemoryStore, CategoriesModel) {
        let store = MemoryStore::new();
        let model = CategoriesModel::new(Arc::new(store.category_store()));
        (store, model)
    }

    fn titles(model: &CategoriesModel) -> Vec<&str> {
        model.categories().iter().map(|c| c.title.as_str()).collect()
    }

    #[test]
    fn test_create_category_sorted() {
        let (_store, mut model) = model();
        model.create_category("Work").unwrap();
        model.create_category("  Health ").unwrap();
        assert_eq!(titles(&model), vec!["Health", "Work"]);
    }

    #[test]
    fn test_create_existing_is_noop() {
        let (_store, mut model) = model();
        model.create_category("Work").unwrap();
        model.create_category("Work").unwrap();
        assert_eq!(titles(&model), vec!["Work"]);
        assert!(!model.refresh());
    }

    #[test]
    fn test_create_empty_rejected() {
        let (_store, mut model) = model();
        let err = model.create_category("   ").unwrap_err();
        assert!(matches!(err, StoreError::InvalidCategory(_)));
        assert!(model.categories().is_empty());
    }

    #[test]
    fn test_select_category_publishes() {
        let (_store, mut model) = model();
        model.create_category("Health").unwrap();
        model.create_category("Work").unwrap();

        let picked = Rc::new(RefCell::new(Vec::new()));
        let sink = picked.clone();
        model.on_select(move |category| sink.borrow_mut().push(category.title.clone()));

        assert_eq!(model.select_category(1).map(|c| c.title), Some("Work".to_string()));
        assert!(model.select_category(5).is_none());
        assert_eq!(*picked.borrow(), vec!["Work".to_string()]);
    }

    #[test]
    fn test_external_creation_seen_on_refresh() {
        let (store, mut model) = model();
        let lists = Rc::new(RefCell::new(Vec::new()));
        let sink = lists.clone();
        model.subscribe(move |categories| sink.borrow_mut().push(categories.len()));

        store.category_store().create("Chores").unwrap();
        assert!(model.refresh());
        assert_eq!(*lists.borrow(), vec![0, 1]);
    }
}
