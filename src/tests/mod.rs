//! Flows across the whole engine: in-memory storage, a manual clock and
//! the mock gateway, driven through the services and the HTTP router.

mod booking_flow;
mod common;
