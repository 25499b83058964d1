//! Connecting components to a store.
//!
//! [`connect`] is the higher-order form of `use_selector`: it takes a
//! selector of `(own props) -> key/value map`, and wraps a [`Component`]
//! so that every render receives its own props merged with the selected
//! map. Selected keys win over own props. The default equality gate is
//! [`shallow_equal`], so returning a fresh map of the same values does not
//! refresh.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::warn;

use super::config::Config;
use super::consumer::Consumer;
use crate::error::Result;
use crate::store::{Node, NodeData};
use crate::utils::shallow_equal;
use crate::value::Value;

type PropsSelector = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// Something that renders from a props map.
pub trait Component {
    type Output;

    fn render(&self, props: &Value) -> Self::Output;

    /// Name used in the connected display name.
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

/// Build a [`Connector`] from a props-aware selector.
///
/// ```rust,ignore
/// let s = store.clone();
/// let connected = connect(move |_props| Ok(Value::object([("num", s.get("num"))])), None)
///     .wrap(Counter, move || schedule_render());
///
/// let output = connected.render(&Value::object([("label", "clicks")]))?;
/// ```
pub fn connect<S, V>(selector_with_props: S, config: Option<Config>) -> Connector
where
    S: Fn(&Value) -> Result<V> + Send + Sync + 'static,
    V: Into<Value>,
{
    let defaults = Config::new().equals(shallow_equal);
    Connector {
        selector: Arc::new(move |props: &Value| -> Result<Value> {
            selector_with_props(props).map(Into::into)
        }),
        config: config.unwrap_or_default().merged_with(&defaults),
    }
}

/// A selector and config waiting for a component.
#[derive(Clone)]
pub struct Connector {
    selector: PropsSelector,
    config: Config,
}

impl Connector {
    /// Wrap `component`. `refresh` is called when the selection changes.
    pub fn wrap<C, R>(&self, component: C, refresh: R) -> Connected<C>
    where
        C: Component,
        R: Fn() + Send + Sync + 'static,
    {
        let display_name = format!("Connected({})", component.name());
        Connected {
            component,
            selector: self.selector.clone(),
            config: self.config.clone(),
            consumer: Consumer::new(refresh),
            display_name,
        }
    }
}

/// A component bound to the store through a [`Connector`].
pub struct Connected<C> {
    component: C,
    selector: PropsSelector,
    config: Config,
    consumer: Consumer,
    display_name: String,
}

impl<C: Component> Connected<C> {
    /// Select with `own_props`, merge, and render the wrapped component.
    pub fn render(&self, own_props: &Value) -> Result<C::Output> {
        let selector = self.selector.clone();
        let props = own_props.clone();
        let selected = self.consumer.render(|hooks| {
            hooks.use_selector_with(move || selector(&props), &self.config)
        })?;

        let merged = merge_props(own_props, &selected);
        Ok(self.component.render(&merged))
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn component(&self) -> &C {
        &self.component
    }

    pub fn render_count(&self) -> usize {
        self.consumer.render_count()
    }

    /// Number of refresh signals sent so far.
    pub fn refresh_count(&self) -> usize {
        self.consumer
            .binding(0)
            .map_or(0, |binding| binding.refresh_count())
    }

    pub fn unmount(&self) {
        self.consumer.unmount();
    }
}

fn merge_props(own: &Value, selected: &Value) -> Value {
    let mut props: IndexMap<Arc<str>, Value> = IndexMap::new();
    for source in [own, selected] {
        match source.node() {
            Some(node) => node.read(|data| match data {
                NodeData::Object(fields) => {
                    for (key, value) in fields {
                        props.insert(key.clone(), value.clone());
                    }
                }
                other => {
                    warn!(found = other.kind().name(), "connect expects key/value maps, ignoring");
                }
            }),
            None if source.is_undefined() || source.is_null() => {}
            None => {
                warn!(found = source.type_name(), "connect expects key/value maps, ignoring");
            }
        }
    }
    Value::Node(Node::new(NodeData::Object(props)))
}
