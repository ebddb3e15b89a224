//! Application layer containing the ledger's invariant-preserving operations.
//!
//! `AccountService` validates and applies single-account changes, `AtomicUnit`
//! stages multi-account changes under ordered locks, and `TransferEngine`
//! coordinates journalled transfers on top of both.

pub mod accounts;
pub mod bootstrap;
pub mod engine;
pub mod locks;
pub mod unit;
