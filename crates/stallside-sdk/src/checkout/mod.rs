//! Linear payment flow: a selected listing and a chosen payment method are
//! carried through explicit confirmation to a submitted transaction record.

pub(crate) mod config;
pub(crate) mod flow;
pub(crate) mod method;

pub use config::CheckoutConfig;
pub use flow::{CheckoutFlow, CheckoutSnapshot, CheckoutState, Transaction};
pub use method::PaymentMethod;
