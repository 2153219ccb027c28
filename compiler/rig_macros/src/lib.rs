//! Procedural macros for rig test suites.
//!
//! This crate provides the `#[suite]` attribute, which turns an inherent
//! `impl` block into a declared suite: each marked method becomes one
//! registration on a `rig_suite::Environment`, issued in source order.
//!
//! ```text
//! #[derive(Default)]
//! struct LinkSuite {
//!     rig: Option<Arc<Controller>>,
//! }
//!
//! #[suite("Link Tests")]
//! impl LinkSuite {
//!     #[inject_topo("controller-3dut")]
//!     fn rig(&mut self, rig: Arc<Controller>) {
//!         self.rig = Some(rig);
//!     }
//!
//!     #[before_each]
//!     fn reset(&mut self) { /* ... */ }
//!
//!     #[test_case("link is up", timeout = 5000)]
//!     fn check_link(&mut self) -> Result<(), String> { /* ... */ }
//! }
//! ```
//!
//! This generates `impl rig_suite::DeclaredSuite for LinkSuite`, leaving the
//! `impl` block itself untouched apart from the removed markers.

mod suite;
mod utils;

use proc_macro::TokenStream;

/// Declare a test suite from an inherent `impl` block.
///
/// # Arguments
///
/// - `#[suite]` - untitled suite.
/// - `#[suite("Title")]` - suite grouped under `Title`.
///
/// # Method markers
///
/// - `#[test_case]`, `#[test_case("message")]`,
///   `#[test_case("message", timeout = <millis>)]` - register a test. The
///   message defaults to the method name.
/// - `#[test_only(...)]` - same arguments; registers an exclusive test.
/// - `#[before_all]`, `#[after_all]`, `#[before_each]`, `#[after_each]` -
///   register a lifecycle hook.
/// - `#[inject_topo("kind")]` - on a setter taking one argument; the
///   resource acquired for `kind` is converted with `FromResource` and passed
///   in when the suite starts. At most one per suite.
///
/// Marked methods take `&self` or `&mut self` and return `()` or
/// `Result<(), E>` where `E: Display`.
#[proc_macro_attribute]
pub fn suite(args: TokenStream, item: TokenStream) -> TokenStream {
    suite::expand_suite(args, item)
}
