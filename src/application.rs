//! Application layer: the request dispatcher that composes the domain
//! and infrastructure pieces into the operations an external caller
//! actually invokes.

/// The request dispatcher.
pub mod dispatcher;

pub use dispatcher::RequestDispatcher;
