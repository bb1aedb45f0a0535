//! Payment saga tests.
//!
//! Drives `PaymentSaga` through a `SagaManager` the way a workflow engine
//! would: domain events start and end sagas, callbacks ask for commands,
//! events and queries by message type name.

mod support;

mod concurrency;
mod retry;
mod scenario;
mod startup;
mod terminal;
