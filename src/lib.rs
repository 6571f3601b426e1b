//! `hactor` — a hierarchical actor runtime whose actors can run
//! in-memory, in a forked child process on the same host, or in a
//! remote process over TCP, transparently to the caller (§1 PURPOSE &
//! SCOPE).
//!
//! The typical entry point is [`system::ActorSystem`]: construct one,
//! reach its [`system::ActorSystem::root_actor`], and `create_child` a
//! tree of [`actor::ActorRef`]s from there. A process that is spawned as
//! a forked or remote worker never reaches application code at all —
//! call [`forked::maybe_run_as_worker`] and
//! [`remote::maybe_run_as_remote_worker`] first thing in `main`, before
//! constructing an `ActorSystem`, so the worker bootstrap can take over.
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use hactor::actor::{ActorContext, Behaviour, ChildSpec, Dispatch};
//! use hactor::message::Args;
//! use hactor::system::{ActorSystem, SystemConfig};
//! use serde_json::json;
//!
//! struct Counter(i64);
//!
//! #[async_trait]
//! impl Behaviour for Counter {
//!     async fn dispatch(&mut self, topic: &str, args: Args, _ctx: &ActorContext) -> Dispatch {
//!         match topic {
//!             "plus" => {
//!                 if let Some(n) = args.downcast_ref::<i64>(0) {
//!                     self.0 += n;
//!                 }
//!                 Dispatch::Handled(json!(self.0))
//!             }
//!             _ => Dispatch::NoHandler(args),
//!         }
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let system = ActorSystem::new(SystemConfig::default()).await?;
//! let counter = system
//!     .create_actor(None, ChildSpec::in_memory("counter", Counter(0)))
//!     .await?;
//! let mut args = Args::new();
//! args.push(5i64);
//! let total = counter.send_and_receive("plus", args).await?;
//! assert_eq!(total, json!(5));
//! system.destroy().await?;
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod balancer;
pub mod bus;
pub mod forked;
pub mod inmemory;
pub mod marshal;
pub mod message;
pub mod remote;
pub mod system;
pub mod util;

pub use actor::{ActorRef, Behaviour, ChildSpec};
pub use system::{ActorSystem, SystemConfig};
