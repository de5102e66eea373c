//! Effects produced by one function call.
//!
//! Handlers do not write to the connection themselves; they describe what
//! should happen as an ordered list of [`Effect`]s. The embedding layer
//! delivers replies through its [`ReplySink`] and routes messages to the
//! user. [`Step::deliver`] does the former in order.

use std::path::PathBuf;

use protocol::{ArgMap, OutboundCall, ReplySink, ReplyTarget};

use crate::error::EngineError;
use crate::message::ClientMessage;

/// One observable outcome of a handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// A call to send back to the server.
    Reply(OutboundCall),
    /// A message for the user.
    Message(ClientMessage),
    /// The local file already matched; no transfer took place.
    Unchanged {
        /// The file that was left alone.
        path: PathBuf,
    },
}

/// Ordered effects of one handler invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Step {
    effects: Vec<Effect>,
}

impl Step {
    /// A step with no effects.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            effects: Vec::new(),
        }
    }

    /// Appends an effect.
    pub fn push(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Appends a reply to `target`.
    pub fn reply(&mut self, target: ReplyTarget, args: ArgMap) {
        self.push(Effect::Reply(OutboundCall::new(target, args)));
    }

    /// Appends a reply when a target is present.
    pub fn reply_if(&mut self, target: Option<ReplyTarget>, args: ArgMap) {
        if let Some(target) = target {
            self.reply(target, args);
        }
    }

    /// Appends a message.
    pub fn message(&mut self, message: ClientMessage) {
        self.push(Effect::Message(message));
    }

    /// Appends a failure message for `error`.
    pub fn error(&mut self, error: &EngineError) {
        self.message(ClientMessage::from_error(error));
    }

    /// Records that `path` needed no transfer.
    pub fn unchanged(&mut self, path: impl Into<PathBuf>) {
        self.push(Effect::Unchanged { path: path.into() });
    }

    /// All effects in order.
    #[must_use]
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Replies in order.
    pub fn replies(&self) -> impl Iterator<Item = &OutboundCall> {
        self.effects.iter().filter_map(|effect| match effect {
            Effect::Reply(call) => Some(call),
            _ => None,
        })
    }

    /// Messages in order.
    pub fn messages(&self) -> impl Iterator<Item = &ClientMessage> {
        self.effects.iter().filter_map(|effect| match effect {
            Effect::Message(message) => Some(message),
            _ => None,
        })
    }

    /// Whether an `Unchanged` effect was recorded.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.effects
            .iter()
            .any(|effect| matches!(effect, Effect::Unchanged { .. }))
    }

    /// Sends every reply through `sink` in order and returns the remaining
    /// effects.
    pub fn deliver(self, sink: &mut dyn ReplySink) -> Result<Vec<Effect>, EngineError> {
        let mut rest = Vec::new();
        for effect in self.effects {
            match effect {
                Effect::Reply(call) => sink.send_call(call)?,
                other => rest.push(other),
            }
        }
        Ok(rest)
    }
}

impl Extend<Effect> for Step {
    fn extend<T: IntoIterator<Item = Effect>>(&mut self, iter: T) {
        self.effects.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deliver_sends_replies_in_order_and_keeps_the_rest() {
        let mut step = Step::new();
        step.reply(ReplyTarget::new("first"), ArgMap::new());
        step.message(ClientMessage::info("note", "hello"));
        step.reply(ReplyTarget::new("second"), ArgMap::new());
        step.unchanged("/w/a");

        let mut sink: Vec<OutboundCall> = Vec::new();
        let rest = step.deliver(&mut sink).expect("vec sink");
        let names: Vec<_> = sink.iter().map(|c| c.target.name()).collect();
        assert_eq!(names, ["first", "second"]);
        assert_eq!(rest.len(), 2);
    }

    #[test]
    fn reply_if_skips_absent_target() {
        let mut step = Step::new();
        step.reply_if(None, ArgMap::new());
        assert!(step.is_empty());
    }
}
