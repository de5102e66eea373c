//! Outbound calls and the names they are sent under.
//!
//! The server names the reply function inside the incoming argument map
//! (`confirm`, `decline`, `mergeConfirm`, ...). The engine never hard-codes
//! those names; it carries them as [`ReplyTarget`] values.

use crate::args::ArgMap;
use crate::error::TransportError;

/// Name of the function a reply is sent to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReplyTarget {
    name: String,
}

impl ReplyTarget {
    /// Wraps a function name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Reads the target named by `key`; absent or empty values yield `None`.
    #[must_use]
    pub fn from_args(args: &ArgMap, key: &str) -> Option<Self> {
        args.non_empty_str(key).map(Self::new)
    }

    /// The function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A function call the client sends back to the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundCall {
    /// Function to invoke on the server.
    pub target: ReplyTarget,
    /// Arguments.
    pub args: ArgMap,
}

impl OutboundCall {
    /// Creates a call.
    #[must_use]
    pub const fn new(target: ReplyTarget, args: ArgMap) -> Self {
        Self { target, args }
    }
}

/// Transport seam: delivers outbound calls in order.
///
/// Framing and flushing belong to the implementor.
pub trait ReplySink {
    /// Queues or sends one call.
    fn send_call(&mut self, call: OutboundCall) -> Result<(), TransportError>;
}

impl ReplySink for Vec<OutboundCall> {
    fn send_call(&mut self, call: OutboundCall) -> Result<(), TransportError> {
        logging::trace_proto!("queued {} ({} args)", call.target.name(), call.args.len());
        self.push(call);
        Ok(())
    }
}

impl<S: ReplySink + ?Sized> ReplySink for &mut S {
    fn send_call(&mut self, call: OutboundCall) -> Result<(), TransportError> {
        (**self).send_call(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::keys;

    #[test]
    fn target_comes_from_named_key() {
        let args = ArgMap::new()
            .with(keys::CONFIRM, "dm-OpenFile")
            .with(keys::DECLINE, "");
        assert_eq!(
            ReplyTarget::from_args(&args, keys::CONFIRM),
            Some(ReplyTarget::new("dm-OpenFile"))
        );
        assert_eq!(ReplyTarget::from_args(&args, keys::DECLINE), None);
        assert_eq!(ReplyTarget::from_args(&args, keys::OPEN), None);
    }

    #[test]
    fn vec_sink_preserves_order() {
        let mut sink: Vec<OutboundCall> = Vec::new();
        for name in ["a", "b", "c"] {
            sink.send_call(OutboundCall::new(ReplyTarget::new(name), ArgMap::new()))
                .expect("vec sink never fails");
        }
        let names: Vec<_> = sink.iter().map(|c| c.target.name()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }
}
