// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Browser side of the widget: the notebook host's model object, and the `render`
//! entry point the host calls with a model and an element to draw into.

use std::cell::Cell;
use std::rc::Rc;

use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement};

use crate::counter::CounterView;
use crate::dom::{self, Node};
use crate::logging;
use crate::model::{Callback, ModelBinding, Subscription};
use crate::report::{Error, Report};
use crate::runtime::{self, Mounted};

#[wasm_bindgen]
extern "C" {
    /// Model object handed to widget views by the notebook host.
    #[derive(Clone)]
    pub type AnyModel;

    #[wasm_bindgen(method, js_name = "get")]
    fn get_js(this: &AnyModel, name: &str) -> JsValue;

    #[wasm_bindgen(method, catch, js_name = "set")]
    fn set_js(this: &AnyModel, name: &str, value: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = "save_changes")]
    fn save_changes_js(this: &AnyModel) -> Result<(), JsValue>;

    #[wasm_bindgen(method)]
    fn on(this: &AnyModel, event: &str, callback: &JsValue);

    #[wasm_bindgen(method)]
    fn off(this: &AnyModel, event: &str, callback: &JsValue);
}

/// [`ModelBinding`] over the host's JavaScript model.
#[derive(Clone)]
pub struct JsModel {
    model: AnyModel,
}

impl JsModel {
    pub fn new(model: AnyModel) -> Self {
        JsModel { model }
    }
}

impl ModelBinding for JsModel {
    fn get(&self, field: &str) -> Report<Value> {
        let value = self.model.get_js(field);

        if value.is_undefined() {
            return Err(Error::missing_field(field));
        }

        Ok(to_json(&value))
    }

    fn set(&self, field: &str, value: Value) -> Report<()> {
        let value = from_json(&value)?;

        self.model
            .set_js(field, &value)
            .map_err(|err| Error::host(format!("failed to set `{field}`: {err:?}")))
    }

    fn save_changes(&self) -> Report<()> {
        self.model
            .save_changes_js()
            .map_err(|err| Error::host(format!("failed to save changes: {err:?}")))
    }

    fn on_change(&self, field: &str, callback: Callback) -> Subscription {
        let event = format!("change:{field}");

        // The host doesn't promise to pass the new value along, so read it back.
        let listener = Closure::<dyn Fn()>::new({
            let model = self.model.clone();
            let field = field.to_owned();

            move || callback(&to_json(&model.get_js(&field)))
        });

        self.model.on(&event, listener.as_ref());

        let model = self.model.clone();

        Subscription::new(move || {
            model.off(&event, listener.as_ref());
            drop(listener);
        })
    }
}

/// Convert a scalar JavaScript value. Anything that isn't a number, string or
/// boolean becomes `null`.
pub fn to_json(value: &JsValue) -> Value {
    if let Some(n) = value.as_f64() {
        if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
            return Value::from(n as i64);
        }
        return serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number);
    }

    if let Some(b) = value.as_bool() {
        return Value::Bool(b);
    }

    match value.as_string() {
        Some(s) => Value::String(s),
        None => Value::Null,
    }
}

pub fn from_json(value: &Value) -> Report<JsValue> {
    match value {
        Value::Null => Ok(JsValue::NULL),
        Value::Bool(b) => Ok(JsValue::from_bool(*b)),
        Value::Number(n) => n
            .as_f64()
            .map(JsValue::from_f64)
            .ok_or_else(|| Error::host(format!("{n} can't be passed to the host"))),
        Value::String(s) => Ok(JsValue::from_str(s)),
        Value::Array(_) | Value::Object(_) => Err(Error::host(format!(
            "only scalar values can be passed to the host, got {value}"
        ))),
    }
}

thread_local! {
    static INIT: Cell<bool> = const { Cell::new(false) };
}

fn init() {
    if INIT.get() {
        return;
    }
    INIT.set(true);

    init_panic_hook();
    logging::init();
}

fn init_panic_hook() {
    // Only enable console hook on debug builds
    #[cfg(debug_assertions)]
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
}

fn create(document: &Document, el: &dom::Element) -> Result<web_sys::Element, JsValue> {
    let node = document.create_element(el.tag())?;

    if let Some(class) = el.class_name() {
        node.set_class_name(class);
    }

    for child in el.children() {
        match child {
            Node::Element(child) => node.append_child(&create(document, child)?)?,
            Node::Text(text) => node.append_child(&document.create_text_node(text))?,
        };
    }

    Ok(node)
}

fn report_to_js(err: Error) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Render the counter into `el`. Returns a cleanup function for the host to call
/// when the view goes away.
#[wasm_bindgen]
pub fn render(model: AnyModel, el: HtmlElement) -> Result<JsValue, JsValue> {
    init();

    let view = CounterView::new(JsModel::new(model));
    let mounted: Mounted<JsModel> = runtime::mount(view).map_err(report_to_js)?;

    let document = el
        .owner_document()
        .ok_or_else(|| JsValue::from_str("element is not attached to a document"))?;

    let container = mounted.with_product(|p| create(&document, p.element()))?;
    let button = container
        .query_selector("button")?
        .ok_or_else(|| JsValue::from_str("counter has no button"))?;

    el.append_child(&container)?;

    mounted.on_render({
        let button = button.clone();

        move |p| button.set_text_content(Some(&p.label()))
    });

    let mounted = Rc::new(mounted);

    let click = Closure::<dyn Fn()>::new({
        let mounted = mounted.clone();

        move || {
            if let Err(err) = mounted.activate() {
                log::error!("counter click failed: {err}");
            }
        }
    });

    button.add_event_listener_with_callback("click", click.as_ref().unchecked_ref())?;

    let cleanup = Closure::once_into_js(move || {
        let _ = button.remove_event_listener_with_callback("click", click.as_ref().unchecked_ref());
        container.remove();

        drop(click);
        drop(mounted);

        log::debug!("counter unmounted");
    });

    Ok(cleanup)
}
