//! Vigil Intercept - the request-facing pipeline and its serialization
//! point.
//!
//! Every intercepted request flows through the same stages: agent
//! lookup, policy evaluation, the underlying call (when permitted),
//! then chain extension. Chain extension is the pipeline's single
//! serialization point: one writer thread owns the chain state and
//! consumes a work queue that every producer - OS threads and
//! cooperative tasks alike - pushes onto. Identical ordering semantics
//! fall out of the shared queue regardless of which backend produced
//! the request.
//!
//! Two interchangeable interceptor forms wrap the shared
//! [`Pipeline`]:
//! - [`ThreadedInterceptor`] - call it from as many OS threads as you
//!   like; workers block only on the chain reply and the underlying
//!   call.
//! - [`CooperativeInterceptor`] - `async`; tasks suspend at the same
//!   two points and resume others meanwhile. Drive it with a
//!   current-thread runtime for strictly cooperative scheduling.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod cooperative;
mod error;
mod pipeline;
mod script;
mod threaded;
mod writer;

pub use cooperative::CooperativeInterceptor;
pub use error::{ChainError, ChainResult};
pub use pipeline::Pipeline;
pub use script::{ScriptOutcome, outcomes};
pub use threaded::ThreadedInterceptor;
pub use writer::{ChainHandle, ChainWriter};
