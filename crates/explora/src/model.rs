// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Model bindings
//!
//! The counter never owns its count. The notebook host keeps the state in a model
//! object and hands the widget a binding to it: named fields can be read and written,
//! and the widget can ask to be told when a field changes.
//!
//! [`ModelBinding`] is that seam. In the browser it's implemented over the host's
//! JavaScript model (see the `web` module), everywhere else [`MemoryModel`] stands in
//! for the host.
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::report::{Error, Report};

/// Change listener. Receives the new value of the field it was registered for.
pub type Callback = Rc<dyn Fn(&Value)>;

/// Read, write and observe named fields of a host model.
pub trait ModelBinding {
    /// Current value of `field`.
    fn get(&self, field: &str) -> Report<Value>;

    /// Replace the value of `field`. Hosts are free to notify listeners
    /// synchronously from within this call.
    fn set(&self, field: &str, value: Value) -> Report<()>;

    /// Push local writes out to the host's other side.
    fn save_changes(&self) -> Report<()> {
        Ok(())
    }

    /// Register `callback` to run whenever `field` changes. The listener stays
    /// registered for as long as the returned [`Subscription`] lives.
    fn on_change(&self, field: &str, callback: Callback) -> Subscription;
}

impl<M> ModelBinding for &M
where
    M: ModelBinding + ?Sized,
{
    fn get(&self, field: &str) -> Report<Value> {
        (**self).get(field)
    }

    fn set(&self, field: &str, value: Value) -> Report<()> {
        (**self).set(field, value)
    }

    fn save_changes(&self) -> Report<()> {
        (**self).save_changes()
    }

    fn on_change(&self, field: &str, callback: Callback) -> Subscription {
        (**self).on_change(field, callback)
    }
}

impl<M> ModelBinding for Rc<M>
where
    M: ModelBinding + ?Sized,
{
    fn get(&self, field: &str) -> Report<Value> {
        (**self).get(field)
    }

    fn set(&self, field: &str, value: Value) -> Report<()> {
        (**self).set(field, value)
    }

    fn save_changes(&self) -> Report<()> {
        (**self).save_changes()
    }

    fn on_change(&self, field: &str, callback: Callback) -> Subscription {
        (**self).on_change(field, callback)
    }
}

/// Handle to a registered change listener. Dropping it unregisters the listener.
#[must_use = "dropping a `Subscription` unregisters the listener right away"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Create a subscription that runs `cancel` when dropped.
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Subscription {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Unregister the listener now.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
struct ListenerId(u32);

struct Listener {
    id: ListenerId,
    field: String,
    callback: Callback,
}

#[derive(Default)]
struct Inner {
    fields: HashMap<String, Value>,
    listeners: Vec<Listener>,
    pending: Vec<String>,
    saves: usize,
}

/// In-process model that behaves like a notebook host: listeners of a field only
/// hear about writes that actually change its value.
///
/// ```
/// use explora::model::{MemoryModel, ModelBinding};
/// use serde_json::json;
///
/// let model = MemoryModel::new().with_field("value", 0);
///
/// model.set("value", json!(5)).unwrap();
///
/// assert_eq!(model.get("value").unwrap(), json!(5));
/// ```
#[derive(Clone, Default)]
pub struct MemoryModel {
    inner: Rc<RefCell<Inner>>,
    next_id: Rc<Cell<u32>>,
}

impl MemoryModel {
    pub fn new() -> Self {
        MemoryModel::default()
    }

    /// Builder-style field initialization. Doesn't notify anyone or mark
    /// the field as pending.
    pub fn with_field<V>(self, field: &str, value: V) -> Self
    where
        V: Into<Value>,
    {
        self.insert(field, value);
        self
    }

    /// Write a field without notifying listeners or marking it as pending.
    pub fn insert<V>(&self, field: &str, value: V)
    where
        V: Into<Value>,
    {
        self.inner
            .borrow_mut()
            .fields
            .insert(field.to_owned(), value.into());
    }

    /// Remove a field, returning its last value.
    pub fn remove(&self, field: &str) -> Option<Value> {
        self.inner.borrow_mut().fields.remove(field)
    }

    /// Fields written since the last [`save_changes`](ModelBinding::save_changes).
    pub fn pending(&self) -> Vec<String> {
        self.inner.borrow().pending.clone()
    }

    /// Number of times [`save_changes`](ModelBinding::save_changes) was called.
    pub fn saves(&self) -> usize {
        self.inner.borrow().saves
    }

    /// Number of listeners currently registered, across all fields.
    pub fn listeners(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    fn notify(&self, field: &str, value: &Value) {
        // Listeners may read or write the model, so the borrow must end before they run.
        let callbacks: Vec<Callback> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .filter(|listener| listener.field == field)
            .map(|listener| listener.callback.clone())
            .collect();

        for callback in callbacks {
            callback(value);
        }
    }
}

impl ModelBinding for MemoryModel {
    fn get(&self, field: &str) -> Report<Value> {
        self.inner
            .borrow()
            .fields
            .get(field)
            .cloned()
            .ok_or_else(|| Error::missing_field(field))
    }

    fn set(&self, field: &str, value: Value) -> Report<()> {
        {
            let mut inner = self.inner.borrow_mut();

            if inner.fields.get(field) == Some(&value) {
                return Ok(());
            }

            inner.fields.insert(field.to_owned(), value.clone());

            if !inner.pending.iter().any(|f| f == field) {
                inner.pending.push(field.to_owned());
            }
        }

        self.notify(field, &value);

        Ok(())
    }

    fn save_changes(&self) -> Report<()> {
        let mut inner = self.inner.borrow_mut();

        inner.pending.clear();
        inner.saves += 1;

        Ok(())
    }

    fn on_change(&self, field: &str, callback: Callback) -> Subscription {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0.wrapping_add(1));

        self.inner.borrow_mut().listeners.push(Listener {
            id,
            field: field.to_owned(),
            callback,
        });

        let inner: Weak<RefCell<Inner>> = Rc::downgrade(&self.inner);

        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.borrow_mut().listeners.retain(|l| l.id != id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn counting(model: &MemoryModel, field: &str) -> (Rc<Cell<usize>>, Subscription) {
        let hits = Rc::new(Cell::new(0));
        let sub = model.on_change(field, {
            let hits = hits.clone();
            Rc::new(move |_: &Value| hits.set(hits.get() + 1))
        });

        (hits, sub)
    }

    #[test]
    fn missing_field() {
        let model = MemoryModel::new().with_field("value", 1);

        assert_eq!(model.remove("value"), Some(json!(1)));

        let err = model.get("value").unwrap_err();

        assert_eq!(err.kind(), crate::report::ErrorKind::MissingField);
    }

    #[test]
    fn notifies_only_on_change() {
        let model = MemoryModel::new().with_field("value", 1);
        let (hits, _sub) = counting(&model, "value");

        model.set("value", json!(1)).unwrap();
        assert_eq!(hits.get(), 0);

        model.set("value", json!(2)).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn listeners_are_per_field() {
        let model = MemoryModel::new().with_field("value", 0);
        let (hits, _sub) = counting(&model, "other");

        model.set("value", json!(7)).unwrap();

        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn callback_receives_new_value() {
        let model = MemoryModel::new().with_field("value", 0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let _sub = model.on_change("value", {
            let seen = seen.clone();
            Rc::new(move |v: &Value| seen.borrow_mut().push(v.clone()))
        });

        model.set("value", json!(3)).unwrap();
        model.set("value", json!(4)).unwrap();

        assert_eq!(*seen.borrow(), [json!(3), json!(4)]);
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let model = MemoryModel::new().with_field("value", 0);
        let (hits, sub) = counting(&model, "value");

        assert_eq!(model.listeners(), 1);
        drop(sub);
        assert_eq!(model.listeners(), 0);

        model.set("value", json!(1)).unwrap();
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn subscription_outliving_model() {
        let model = MemoryModel::new();
        let (_, sub) = counting(&model, "value");

        drop(model);
        sub.cancel();
    }

    #[test]
    fn pending_until_saved() {
        let model = MemoryModel::new().with_field("value", 0);

        model.set("value", json!(1)).unwrap();
        model.set("value", json!(2)).unwrap();
        assert_eq!(model.pending(), ["value"]);

        model.save_changes().unwrap();
        assert!(model.pending().is_empty());
        assert_eq!(model.saves(), 1);
    }

    #[test]
    fn listener_can_write_back() {
        let model = MemoryModel::new().with_field("value", 0);

        let _sub = model.on_change("value", {
            let model = model.clone();
            Rc::new(move |v: &Value| {
                let mirrored = v.as_i64().unwrap_or_default();
                model.set("mirror", json!(mirrored)).unwrap();
            })
        });

        model.set("value", json!(9)).unwrap();

        assert_eq!(model.get("mirror").unwrap(), json!(9));
    }

    #[test]
    fn binding_through_references() {
        let model = Rc::new(MemoryModel::new().with_field("value", 2));

        fn read<M: ModelBinding>(m: M) -> Value {
            m.get("value").unwrap()
        }

        assert_eq!(read(&*model), json!(2));
        assert_eq!(read(model.clone()), json!(2));
    }
}
