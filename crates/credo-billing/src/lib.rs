//! # credo-billing — Pricing & Subscription Transaction Engine
//!
//! The commerce gate that precedes access to the Credo portal's credential
//! features. Institutions and employers buy a plan; this crate holds the
//! rules that decide what they pay and what they get.
//!
//! ## Components
//!
//! - [`plan`] — the purchasable plan catalog types and feature map.
//! - [`promo`] — promo-code evaluation: a code either yields a discount or
//!   a typed rejection, in a fixed, deterministic check order.
//! - [`transaction`] — the immutable purchase-attempt record and its
//!   status state machine.
//! - [`subscription`] — the entitlement record derived from exactly one
//!   completed transaction, and the activation rules.
//! - [`checkout`] — quoting: catalog + validator + clamping composed into
//!   one purchase decision.
//!
//! ## Design
//!
//! Everything here is pure and synchronous. Lookups, persistence, and the
//! atomicity of activation belong to the store behind the API layer; this
//! crate only states the rules the store must apply. The one mutation it
//! defines — [`promo::PromoCode::redeem`] — checks the usage cap and
//! increments in a single call precisely so the store can run it inside
//! its own exclusive section and never split the check from the write.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - Amounts are `rust_decimal::Decimal`; floats never enter the engine.

pub mod checkout;
pub mod plan;
pub mod promo;
pub mod subscription;
pub mod transaction;

// Re-export primary types for ergonomic imports.
pub use checkout::{CheckoutError, Quote};
pub use plan::{FeatureValue, PricingPlan};
pub use promo::{CanonicalCode, Discount, PromoCode, PromoRejection};
pub use subscription::{
    ActivationError, ActivationOutcome, Subscription, SubscriptionError, SubscriptionStatus,
};
pub use transaction::{Transaction, TransactionError, TransactionStatus};
