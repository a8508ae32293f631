//! Propagation and instrumentation wrappers for outbound adapters.
//!
//! [`InstrumentedClient`] wraps request/response adapters and
//! [`InstrumentedPubSub`] wraps message brokers. Both inject the active
//! scope's identity into outbound headers and log every call.

mod adapter;
mod client;
mod policy;
mod pubsub;

#[cfg(test)]
pub use adapter::MockDelivery;
pub use adapter::{
    handler, Adapter, Delivery, GenericRequest, GenericResponse, HandlerFuture, HeaderValue,
    Message, MessageHandler, PubSubAdapter, RequestAdapter,
};
pub use client::InstrumentedClient;
pub use policy::PropagationPolicy;
pub use pubsub::InstrumentedPubSub;
