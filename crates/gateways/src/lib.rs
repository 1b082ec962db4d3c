//! Payment-provider adapters.
//!
//! Two externally hosted providers with incompatible completion protocols:
//!
//! - [`hosted`]: a hosted checkout session settled by an out-of-band signed
//!   server-to-server callback (the customer redirect carries no authoritative
//!   state).
//! - [`wallet`]: a two-phase flow: create an intent, let the customer approve
//!   it at the provider, then capture explicitly from the client.
//!
//! Adapters translate provider payloads into the tagged events/results the
//! reconciliation engine consumes; they never write ledger state themselves.

pub mod error;
pub mod events;
pub mod hosted;
pub mod wallet;

pub use error::GatewayError;
pub use events::{CallbackEvent, CheckoutContext};
pub use hosted::{CheckoutSession, HostedConfig, HostedGateway};
pub use wallet::{CaptureResult, IntentHandle, WalletConfig, WalletGateway};
