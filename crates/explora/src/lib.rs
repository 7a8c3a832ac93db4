// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Explora
//!
//! _A counter widget for notebook hosts, and the surprise statistics it ships with._
//!
//! The widget is a single button labeled `count is {value}`. The count itself lives in
//! the notebook host's model, not in the widget: the widget reads the `value` field to
//! render, writes `value + 1` back on click, and re-renders whenever the host reports
//! that the field changed, whichever side changed it.
//!
//! ### Example
//!
//! ```
//! use explora::prelude::*;
//! use serde_json::json;
//!
//! // Stand-in for the host model
//! let model = MemoryModel::new().with_field("value", 0);
//!
//! let counter = explora::runtime::mount(CounterView::new(model.clone())).unwrap();
//! assert_eq!(counter.label(), "count is 0");
//!
//! counter.activate().unwrap();
//! assert_eq!(counter.label(), "count is 1");
//! assert_eq!(model.get("value").unwrap(), json!(1));
//! ```
//!
//! ### In the browser
//!
//! Built for `wasm32-unknown-unknown`, the crate exports a `render(model, el)` function
//! matching what notebook hosts expect from a widget module. `js/widget.js` wraps it
//! into an ES module with a default `{ render }` export, and `js/widget.css` holds the
//! widget's style (also available as [`STYLE`]).
//!
//! ```sh
//! cargo build --release --target=wasm32-unknown-unknown
//! wasm-bindgen target/wasm32-unknown-unknown/release/explora.wasm --out-dir static --target=web
//! ```
//!
//! ### Surprise
//!
//! The [`surprise`] module computes Bayesian surprise over per-region rates, the
//! analysis the widget was built to explore.

#[cfg(all(
    target_arch = "wasm32",
    feature = "rlsf",
    not(target_feature = "atomics")
))]
#[global_allocator]
static A: rlsf::SmallGlobalTlsf = rlsf::SmallGlobalTlsf::new();

pub mod counter;
pub mod dom;
pub mod logging;
pub mod model;
pub mod report;
pub mod runtime;
pub mod surprise;

#[cfg(target_arch = "wasm32")]
pub mod web;

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Style sheet for the widget container.
pub const STYLE: &str = include_str!("../js/widget.css");

/// The prelude module with most commonly used types.
///
/// Intended use is:
/// ```
/// use explora::prelude::*;
/// ```
pub mod prelude {
    pub use crate::counter::{CounterView, Options};
    pub use crate::model::{MemoryModel, ModelBinding};
    pub use crate::report::{Error, Report};
    pub use crate::runtime::{mount, Mounted, Then};
    pub use crate::View;
}

/// Trait that describes types that can be rendered.
pub trait View {
    /// The product should contain the rendered output of this View and
    /// any data it needs to update itself.
    type Product;

    /// Build a product from this type.
    fn build(self) -> Self::Product;

    /// Update the product, changing only what needs changing.
    fn update(self, p: &mut Self::Product);
}
