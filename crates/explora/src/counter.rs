// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # The counter widget
//!
//! A single button labeled `count is {value}`. Clicking it writes `value + 1` back
//! to the host model, and the host's change notification brings the new value back
//! into the label.
//!
//! ```
//! use explora::prelude::*;
//!
//! let model = MemoryModel::new().with_field("value", 0);
//! let view = CounterView::new(model.clone());
//!
//! assert_eq!(
//!     view.render().unwrap().to_string(),
//!     r#"<div class="surprise_explora"><button>count is 0</button></div>"#,
//! );
//!
//! view.on_activate().unwrap();
//!
//! assert_eq!(view.count().unwrap(), 1);
//! ```
use serde::Deserialize;
use serde_json::Value;

use crate::dom::Element;
use crate::model::ModelBinding;
use crate::report::{Error, ErrorExt, ErrorKind, Report};
use crate::runtime::Then;
use crate::View;

/// The largest count the widget will write. Browser hosts hold numbers as `f64`,
/// which can't represent every integer past this point.
pub const MAX_COUNT: i64 = (1 << 53) - 1;

const LABEL: &str = "count is ";

/// Widget configuration. Both settings have defaults matching the host side
/// of the widget, so most embedders never need to touch this.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Name of the model field holding the count.
    pub field: String,
    /// Class applied to the container element.
    pub class: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            field: "value".into(),
            class: "surprise_explora".into(),
        }
    }
}

impl Options {
    pub fn field<F>(mut self, field: F) -> Self
    where
        F: Into<String>,
    {
        self.field = field.into();
        self
    }

    pub fn class<C>(mut self, class: C) -> Self
    where
        C: Into<String>,
    {
        self.class = class.into();
        self
    }

    /// Parse options from JSON, filling in defaults for missing keys.
    pub fn from_json(json: &str) -> Report<Self> {
        serde_json::from_str(json).message("failed to parse widget options")
    }
}

/// The label shown on the button.
pub fn label(count: i64) -> String {
    let mut buf = itoa::Buffer::new();
    let digits = buf.format(count);

    let mut out = String::with_capacity(LABEL.len() + digits.len());
    out.push_str(LABEL);
    out.push_str(digits);
    out
}

/// `count + 1`, or `None` once the count reached [`MAX_COUNT`].
pub fn increment(count: i64) -> Option<i64> {
    if count >= MAX_COUNT {
        None
    } else {
        Some(count + 1)
    }
}

/// Read a count out of a field value. Integral floats are accepted, since that's
/// what every number looks like coming out of JavaScript. Values past
/// [`MAX_COUNT`] still decode as long as they fit an `i64`.
pub fn decode(field: &str, value: &Value) -> Report<i64> {
    let decoded = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        _ => None,
    };

    decoded.ok_or_else(|| {
        Error::new(
            ErrorKind::NotAnInteger,
            format!("field `{field}` holds {value}, expected an integer"),
        )
    })
}

/// Transient markup of the counter, rendered into an [`Element`].
#[derive(Debug, Clone, Copy)]
pub struct Counter<'a> {
    pub class: &'a str,
    pub count: i64,
}

/// Rendered counter, with the count it was last rendered for.
#[derive(Debug, Clone)]
pub struct CounterProduct {
    element: Element,
    count: i64,
}

impl CounterProduct {
    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn label(&self) -> String {
        self.element
            .find("button")
            .map(Element::text_content)
            .unwrap_or_default()
    }
}

impl View for Counter<'_> {
    type Product = CounterProduct;

    fn build(self) -> CounterProduct {
        let element = Element::new("div")
            .class(self.class.to_owned())
            .child(Element::new("button").text(label(self.count)));

        CounterProduct {
            element,
            count: self.count,
        }
    }

    fn update(self, p: &mut CounterProduct) {
        if p.count == self.count {
            return;
        }

        p.count = self.count;

        if let Some(button) = p.element.find_mut("button") {
            button.set_text(label(self.count));
        }
    }
}

/// Counter view bound to a host model.
pub struct CounterView<M> {
    model: M,
    options: Options,
}

impl<M> CounterView<M>
where
    M: ModelBinding,
{
    pub fn new(model: M) -> Self {
        CounterView::with_options(model, Options::default())
    }

    pub fn with_options(model: M, options: Options) -> Self {
        CounterView { model, options }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Current count held by the model.
    pub fn count(&self) -> Report<i64> {
        let field = &self.options.field;

        decode(field, &self.model.get(field)?)
    }

    /// Markup for the given count.
    pub fn markup(&self, count: i64) -> Counter<'_> {
        Counter {
            class: &self.options.class,
            count,
        }
    }

    /// Render the current count. Doesn't touch the model beyond reading it.
    pub fn render(&self) -> Report<Element> {
        let count = self.count()?;

        Ok(self.markup(count).build().element)
    }

    /// Click handler: write `count + 1` back to the model.
    pub fn on_activate(&self) -> Report<Then> {
        let field = &self.options.field;
        let count = self.count()?;

        let Some(next) = increment(count) else {
            log::warn!("`{field}` is at {count}, refusing to increment past {MAX_COUNT}");

            return Ok(Then::Stop);
        };

        self.model.set(field, Value::from(next))?;
        self.model.save_changes()?;

        log::debug!("`{field}` incremented to {next}");

        Ok(Then::Render)
    }
}
