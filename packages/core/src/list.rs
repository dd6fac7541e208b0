//! Observable list
//!
//! Every mutating call re-prepares the items (raw objects become submodels, raw
//! arrays become nested lists, element models link to the owning delegate) and
//! then emits exactly one `update` on the owning delegate. Observers learn that
//! the list changed, not which index.

use crate::data::Data;
use crate::delegate::{Delegate, WeakDelegate};
use kontext_common::EventLoop;
use serde_json::Value;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

struct ListInner {
    items: RefCell<Vec<Data>>,
    owner: RefCell<Option<WeakDelegate>>,
    event_loop: EventLoop,
}

/// Shared handle to an observable list
#[derive(Clone)]
pub struct List {
    inner: Rc<ListInner>,
}

impl List {
    pub fn new(event_loop: &EventLoop) -> Self {
        Self {
            inner: Rc::new(ListInner {
                items: RefCell::new(Vec::new()),
                owner: RefCell::new(None),
                event_loop: event_loop.clone(),
            }),
        }
    }

    pub(crate) fn from_values(event_loop: &EventLoop, values: Vec<Value>) -> Self {
        let list = Self::new(event_loop);
        *list.inner.items.borrow_mut() = values.into_iter().map(Data::Value).collect();
        list.prepare_items();
        list
    }

    pub fn ptr_eq(&self, other: &List) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The delegate whose `update` reports mutations of this list
    pub fn owner(&self) -> Option<Delegate> {
        self.inner
            .owner
            .borrow()
            .as_ref()
            .and_then(WeakDelegate::upgrade)
    }

    // ------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Data> {
        self.inner.items.borrow().get(index).cloned()
    }

    pub fn to_vec(&self) -> Vec<Data> {
        self.inner.items.borrow().clone()
    }

    pub fn snapshot(&self) -> Value {
        Value::Array(self.to_vec().iter().map(Data::snapshot).collect())
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Returns the new length
    pub fn push(&self, item: impl Into<Data>) -> usize {
        let item = item.into();
        self.mutate(|items| {
            items.push(item);
            items.len()
        })
    }

    pub fn pop(&self) -> Option<Data> {
        let removed = self.mutate(|items| items.pop());
        self.forget(removed.iter());
        removed
    }

    pub fn shift(&self) -> Option<Data> {
        let removed = self.mutate(|items| {
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        });
        self.forget(removed.iter());
        removed
    }

    /// Returns the new length
    pub fn unshift(&self, item: impl Into<Data>) -> usize {
        let item = item.into();
        self.mutate(|items| {
            items.insert(0, item);
            items.len()
        })
    }

    /// Remove `delete_count` items at `start` and insert `insert` in their place
    ///
    /// Both bounds are clamped to the list. Returns the removed items.
    pub fn splice<I>(&self, start: usize, delete_count: usize, insert: I) -> Vec<Data>
    where
        I: IntoIterator,
        I::Item: Into<Data>,
    {
        let insert: Vec<Data> = insert.into_iter().map(Into::into).collect();
        let removed = self.mutate(|items| {
            let start = start.min(items.len());
            let end = start.saturating_add(delete_count).min(items.len());
            items.splice(start..end, insert).collect::<Vec<_>>()
        });
        self.forget(removed.iter());
        removed
    }

    /// Sort by text form, like an untyped comparison of string representations
    pub fn sort(&self) {
        self.mutate(|items| items.sort_by_key(Data::to_text));
    }

    pub fn sort_by(&self, compare: impl FnMut(&Data, &Data) -> Ordering) {
        self.mutate(|items| items.sort_by(compare));
    }

    pub fn reverse(&self) {
        self.mutate(|items| items.reverse());
    }

    /// Overwrite `start..end` (clamped; `None` means the end) with `value`
    pub fn fill(&self, value: impl Into<Data>, start: usize, end: Option<usize>) {
        let value = value.into();
        let replaced = self.mutate(|items| {
            let end = end.unwrap_or(items.len()).min(items.len());
            let start = start.min(end);
            let mut replaced = Vec::new();
            for slot in &mut items[start..end] {
                replaced.push(std::mem::replace(slot, value.clone()));
            }
            replaced
        });
        self.forget(replaced.iter());
    }

    /// Copy `start..end` to `target`, overwriting without changing the length
    pub fn copy_within(&self, target: usize, start: usize, end: Option<usize>) {
        let replaced = self.mutate(|items| {
            let len = items.len();
            let end = end.unwrap_or(len).min(len);
            let start = start.min(end);
            let target = target.min(len);
            let count = (end - start).min(len - target);
            let source: Vec<Data> = items[start..start + count].to_vec();
            let mut replaced = Vec::with_capacity(count);
            for (offset, item) in source.into_iter().enumerate() {
                replaced.push(std::mem::replace(&mut items[target + offset], item));
            }
            replaced
        });
        self.forget(replaced.iter());
    }

    /// Assign one index; writing past the end pads with nulls
    pub fn set_index(&self, index: usize, value: impl Into<Data>) -> Option<Data> {
        let value = value.into();
        let prior = self.mutate(|items| {
            if index < items.len() {
                Some(std::mem::replace(&mut items[index], value))
            } else {
                items.resize_with(index, Data::null);
                items.push(value);
                None
            }
        });
        self.forget(prior.iter());
        prior
    }

    /// Replace every item, returning the old ones
    pub fn replace<I>(&self, items: I) -> Vec<Data>
    where
        I: IntoIterator,
        I::Item: Into<Data>,
    {
        let incoming: Vec<Data> = items.into_iter().map(Into::into).collect();
        let removed = self.mutate(|items| std::mem::replace(items, incoming));
        self.forget(removed.iter());
        removed
    }

    // ------------------------------------------------------------------
    // Ownership
    // ------------------------------------------------------------------

    /// First owner wins
    pub(crate) fn claim(&self, delegate: &Delegate) {
        self.claim_weak(&delegate.downgrade());
    }

    fn claim_weak(&self, owner: &WeakDelegate) {
        {
            let mut current = self.inner.owner.borrow_mut();
            if current.as_ref().and_then(WeakDelegate::upgrade).is_some() {
                return;
            }
            *current = Some(owner.clone());
        }
        self.prepare_items();
    }

    pub(crate) fn release(&self, delegate: &Delegate) {
        let owner = delegate.downgrade();
        let released = {
            let mut current = self.inner.owner.borrow_mut();
            match current.as_ref() {
                Some(existing) if existing.ptr_eq(&owner) => {
                    *current = None;
                    true
                }
                _ => false,
            }
        };
        if released {
            for item in self.to_vec() {
                if let Data::Model(model) = item {
                    model.remove_owner(&owner);
                }
            }
        }
    }

    fn mutate<R>(&self, mutation: impl FnOnce(&mut Vec<Data>) -> R) -> R {
        let result = mutation(&mut self.inner.items.borrow_mut());
        self.prepare_items();
        match self.owner() {
            Some(owner) => owner.notify(),
            None => debug!("List mutated without an owner"),
        }
        result
    }

    fn prepare_items(&self) {
        let owner = self.inner.owner.borrow().clone();
        let items = std::mem::take(&mut *self.inner.items.borrow_mut());
        let items: Vec<Data> = items
            .into_iter()
            .map(|item| item.promote(&self.inner.event_loop))
            .collect();

        if let Some(owner) = &owner {
            for item in &items {
                match item {
                    Data::Model(model) => model.add_owner(owner),
                    Data::List(nested) => nested.claim_weak(owner),
                    Data::Value(_) => {}
                }
            }
        }
        *self.inner.items.borrow_mut() = items;
    }

    /// Unlink removed models that are no longer in the list
    fn forget<'a>(&self, removed: impl Iterator<Item = &'a Data>) {
        let Some(owner) = self.inner.owner.borrow().clone() else {
            return;
        };
        let items = self.to_vec();
        for item in removed {
            if let Data::Model(model) = item {
                if !items.iter().any(|kept| kept.same_identity(item)) {
                    model.remove_owner(&owner);
                }
            }
        }
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.items.try_borrow() {
            Ok(items) => f.debug_list().entries(items.iter()).finish(),
            Err(_) => f.write_str("List(<busy>)"),
        }
    }
}
