//! # credo-core — Foundational Types for the Credo Portal
//!
//! This crate is the bedrock of the Credo workspace. It defines the
//! type-system primitives shared by the commerce engine and the API layer.
//! Every other crate in the workspace depends on `credo-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `PlanId`, `TransactionId`,
//!    `SubscriptionId`, `WalletAddress`, `CurrencyCode` — all newtypes with
//!    validated constructors where validation applies. No bare strings for
//!    identifiers.
//!
//! 2. **Single `AccountType` enum.** One definition, exhaustive `match`
//!    everywhere. Adding an account type forces every consumer to handle it.
//!
//! 3. **UTC-only timestamps.** The `Timestamp` type enforces UTC at seconds
//!    precision, so equality survives a serde round trip through any store.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `credo-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize`.

pub mod account;
pub mod error;
pub mod identity;
pub mod money;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use account::AccountType;
pub use error::ValidationError;
pub use identity::{PlanId, SubscriptionId, TransactionId, WalletAddress};
pub use money::CurrencyCode;
pub use temporal::Timestamp;
