//! Registration tables built once per saga definition.
//!
//! - [`MessageFactoryRegistry`]: message type name → builder over saga state
//! - [`ResponseHandlerRegistry`]: response type name → state mutation
//!
//! Both are immutable after construction and shared read-only by every
//! instance of the definition.

mod factory;
mod response;

pub use factory::MessageFactoryRegistry;
pub use response::ResponseHandlerRegistry;

/// Reduce a qualified type name (`com.acme.api.WithdrawAmount`,
/// `payment::WithdrawAmount`) to its last segment.
pub(crate) fn simple_name(type_name: &str) -> &str {
    let after_path = type_name.rsplit("::").next().unwrap_or(type_name);
    after_path.rsplit('.').next().unwrap_or(after_path)
}
