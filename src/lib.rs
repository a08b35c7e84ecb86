// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![forbid(unsafe_code)]               // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Office365 License Manager
//!
//! A declarative, idempotent license assignment manager for Office365 users,
//! driven by the Microsoft Graph API.
//!
//! ## Overview
//!
//! `o365lm` manages user license assignments the way infrastructure tools
//! manage infrastructure:
//!
//! - Declare which users hold which license SKUs (and which service plans
//!   are disabled) in a YAML configuration file
//! - Converge actual assignments to the declaration with the minimal set of
//!   add/remove calls
//! - Detect drift between the declaration and the tenant
//! - Import assignments created outside the tool
//!
//! ## Architecture
//!
//! The system is built around **desired state reconciliation**:
//!
//! 1. **Desired State**: Defined in `o365.licenses.yaml`
//! 2. **Actual State**: Fetched fresh from Microsoft Graph on every operation
//! 3. **Reconciler**: Computes the add/remove delta and applies it in a
//!    single `assignLicense` call per user
//!
//! The comparison key is the SKU identifier; desired SKUs are always
//! resubmitted as adds, so disabled-plan changes ride along as upserts.
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing and validation
//! - [`graph`]: Token acquisition and the Microsoft Graph client
//! - [`diff`]: Delta computation between desired and actual assignments
//! - [`retry`]: Bounded-duration retry policy
//! - [`reconciler`]: Lifecycle operations and config-wide drivers
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! tenant:
//!   name: contoso
//!
//! users:
//!   - user_principal_name: alice@contoso.com
//!     licenses:
//!       - skuid: 6fd2c87f-b296-42f0-b197-1e91e994b900
//!         disabled_plans:
//!           - 5dbe027f-2339-4123-9542-606e4d348a72
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod graph;
pub mod reconciler;
pub mod retry;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, LicenseConfig, UserLicenseConfig};
pub use diff::{DeltaEngine, DiffType, UserLicenseDiff};
pub use error::{O365Error, Result};
pub use graph::{GraphClient, LicenseApi, LicenseAssignment, LicenseDelta, TokenFetcher};
pub use reconciler::{DriftReport, LicenseReconciler, ReconciliationResult};
pub use retry::RetryPolicy;
