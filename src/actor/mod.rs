//! Actor base and lifecycle (§4.1): the state machine, forward list,
//! dynamic behaviour dispatch, and the `ActorRef` handle shared by every
//! execution mode.

mod behaviour;
mod connection;
mod context;
mod core;
pub(crate) mod dispatch;
mod error;
mod forward;
mod proxy;
mod reference;
mod state;
pub(crate) mod worker_loop;

#[cfg(test)]
pub(crate) mod test_support;

pub use behaviour::{Behaviour, Dispatch, NullBehaviour};
pub use connection::Connection;
pub use context::ActorContext;
pub use core::ActorCore;
pub use error::{ActorError, NotReadyReason};
pub use forward::{ForwardList, Matcher};
pub use proxy::{control_topics, ActorProxy};
pub use reference::{ActorRef, ActorRefToken, ChildSpec, Dispatchable, RefLocator, TreeNode};
pub use state::ActorState;
