// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mounting a [`CounterView`] and keeping it rendered.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::counter::{decode, CounterProduct, CounterView};
use crate::model::{ModelBinding, Subscription};
use crate::report::Report;
use crate::View;

/// Describes whether or not a view should be rendered after state changes.
pub trait ShouldRender: 'static {
    fn should_render(self) -> bool;
}

/// An enum that implements the [`ShouldRender`] trait.
/// See [`CounterView::on_activate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Then {
    /// This is a silent update
    Stop,
    /// Render the view after this update
    Render,
}

impl ShouldRender for Then {
    fn should_render(self) -> bool {
        match self {
            Then::Stop => false,
            Then::Render => true,
        }
    }
}

type RenderHook = Box<dyn Fn(&CounterProduct)>;

struct RuntimeData<M> {
    view: CounterView<M>,
    product: RefCell<CounterProduct>,
    renders: Cell<usize>,
    on_render: RefCell<Option<RenderHook>>,
}

impl<M> RuntimeData<M>
where
    M: ModelBinding,
{
    fn update(&self, count: i64) {
        let Ok(mut product) = self.product.try_borrow_mut() else {
            log::debug!("cyclical update of `{}` skipped", self.view.options().field);
            return;
        };

        self.view.markup(count).update(&mut *product);
        self.renders.set(self.renders.get() + 1);

        if let Some(hook) = &*self.on_render.borrow() {
            hook(&*product);
        }
    }

    fn on_change(&self, value: &Value) {
        match decode(&self.view.options().field, value) {
            Ok(count) => self.update(count),
            Err(err) => log::error!("failed to render counter: {err}"),
        }
    }
}

/// A mounted counter. It stays subscribed to its model field, re-rendering on every
/// change, until dropped.
///
/// ```
/// use explora::prelude::*;
/// use serde_json::json;
///
/// let model = MemoryModel::new().with_field("value", 0);
/// let mounted = explora::runtime::mount(CounterView::new(model.clone())).unwrap();
///
/// mounted.activate().unwrap();
/// assert_eq!(mounted.label(), "count is 1");
///
/// // The kernel side changes the value
/// model.set("value", json!(10)).unwrap();
/// assert_eq!(mounted.label(), "count is 10");
/// ```
pub struct Mounted<M> {
    _subscription: Subscription,
    data: Rc<RuntimeData<M>>,
}

/// Render `view` for the first time and subscribe it to its model field.
pub fn mount<M>(view: CounterView<M>) -> Report<Mounted<M>>
where
    M: ModelBinding + 'static,
{
    let count = view.count()?;
    let product = view.markup(count).build();

    log::debug!("mounting counter at {count}");

    let data = Rc::new(RuntimeData {
        view,
        product: RefCell::new(product),
        renders: Cell::new(1),
        on_render: RefCell::new(None),
    });

    let weak: Weak<RuntimeData<M>> = Rc::downgrade(&data);
    let field = data.view.options().field.clone();

    let subscription = data.view.model().on_change(
        &field,
        Rc::new(move |value: &Value| {
            if let Some(data) = weak.upgrade() {
                data.on_change(value);
            }
        }),
    );

    Ok(Mounted {
        _subscription: subscription,
        data,
    })
}

impl<M> Mounted<M>
where
    M: ModelBinding,
{
    pub fn view(&self) -> &CounterView<M> {
        &self.data.view
    }

    /// Run the click handler. The model's change notification re-renders the view;
    /// should the host not notify for local writes, the view re-reads the model.
    pub fn activate(&self) -> Report<Then> {
        let before = self.data.renders.get();
        let then = self.data.view.on_activate()?;

        if then.should_render() && self.data.renders.get() == before {
            self.refresh()?;
        }

        Ok(then)
    }

    /// Re-render from the model's current value.
    pub fn refresh(&self) -> Report<()> {
        let count = self.data.view.count()?;

        self.data.update(count);

        Ok(())
    }

    /// Register a hook to run after every re-render, replacing any previous hook.
    pub fn on_render<F>(&self, hook: F)
    where
        F: Fn(&CounterProduct) + 'static,
    {
        *self.data.on_render.borrow_mut() = Some(Box::new(hook));
    }

    pub fn with_product<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&CounterProduct) -> R,
    {
        f(&*self.data.product.borrow())
    }

    /// Text currently shown on the button.
    pub fn label(&self) -> String {
        self.with_product(CounterProduct::label)
    }

    /// Number of renders so far, the initial one included.
    pub fn renders(&self) -> usize {
        self.data.renders.get()
    }
}
