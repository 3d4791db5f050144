//! Overload expansion: which callback parameter lists a method is exposed with.
//!
//! Every target renders the same forms in the same order, only the syntax
//! differs. The last form is canonical and takes every callback; the others
//! forward to it with null handlers for the callbacks they omit.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Error,
    /// Index into the method's update responses.
    Update(usize),
    Completion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackForm {
    /// Callback parameters following the request, in order.
    pub callbacks: Vec<Callback>,
}

impl CallbackForm {
    pub fn has_error(&self) -> bool {
        self.includes(Callback::Error)
    }

    pub fn has_updates(&self) -> bool {
        self.callbacks
            .iter()
            .any(|callback| matches!(callback, Callback::Update(_)))
    }

    pub fn includes(&self, callback: Callback) -> bool {
        self.callbacks.contains(&callback)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overloads {
    pub sugar: Vec<CallbackForm>,
    pub canonical: CallbackForm,
}

impl Overloads {
    /// `(completion)`, `(error, completion)` and, with updates,
    /// `(updates.., completion)` and `(error, updates.., completion)`.
    pub fn expand(update_count: usize) -> Self {
        let updates: Vec<Callback> = (0..update_count).map(Callback::Update).collect();

        let form = |error: bool, with_updates: bool| {
            let mut callbacks = Vec::with_capacity(update_count + 2);
            if error {
                callbacks.push(Callback::Error);
            }
            if with_updates {
                callbacks.extend(updates.iter().copied());
            }
            callbacks.push(Callback::Completion);
            CallbackForm { callbacks }
        };

        if update_count == 0 {
            Self {
                sugar: vec![form(false, false)],
                canonical: form(true, false),
            }
        } else {
            Self {
                sugar: vec![form(false, false), form(true, false), form(false, true)],
                canonical: form(true, true),
            }
        }
    }

    /// Sugar forms first, canonical form last.
    pub fn all(&self) -> impl Iterator<Item = &CallbackForm> + '_ {
        self.sugar.iter().chain(std::iter::once(&self.canonical))
    }

    pub fn count(&self) -> usize {
        self.sugar.len() + 1
    }
}
