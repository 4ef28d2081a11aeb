use std::any::{Any, TypeId};

use crate::editing::transaction::{Mapping, Transaction};

/// A reducer over per-document derived state.
///
/// The editor owns one state slot per registered plugin. `init` fills the
/// slot when the plugin is registered; `apply` folds the slot through every
/// dispatched transaction. Reducers are pure: they see the transaction (and
/// its metadata payload for this plugin) plus the derived [`Mapping`], and
/// return the next state. They never touch the document directly.
pub trait Plugin: Send + 'static {
    type State: Send + 'static;
    type Meta: Send + 'static;

    fn init(&self) -> Self::State;

    fn apply(&self, tx: &Transaction, mapping: &Mapping, prev: Self::State) -> Self::State;
}

/// Type-erased slot holding one plugin's state and reducer.
pub(crate) struct PluginSlot {
    pub(crate) key: TypeId,
    pub(crate) name: &'static str,
    pub(crate) state: Box<dyn Any + Send>,
    apply: Box<dyn Fn(&Transaction, &Mapping, Box<dyn Any + Send>) -> Box<dyn Any + Send> + Send>,
}

impl PluginSlot {
    pub(crate) fn new<P: Plugin>(plugin: P) -> Self {
        let state: Box<dyn Any + Send> = Box::new(plugin.init());
        Self {
            key: TypeId::of::<P>(),
            name: std::any::type_name::<P>(),
            state,
            apply: Box::new(move |tx, mapping, prev| match prev.downcast::<P::State>() {
                Ok(prev) => Box::new(plugin.apply(tx, mapping, *prev)) as Box<dyn Any + Send>,
                // The slot only ever holds P::State
                Err(prev) => prev,
            }),
        }
    }

    pub(crate) fn run(&mut self, tx: &Transaction, mapping: &Mapping) {
        let prev = std::mem::replace(&mut self.state, Box::new(()));
        self.state = (self.apply)(tx, mapping, prev);
    }
}
