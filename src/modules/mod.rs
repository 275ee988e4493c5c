/*!
 * Standard Feature Modules
 * Reference implementations of the feature-module contract
 */

pub mod aslr;
pub mod common;
pub mod hardening;
pub mod map32bit;
pub mod noexec;
pub mod segvguard;

pub use aslr::AslrModule;
pub use hardening::HardeningModule;
pub use map32bit::DisallowMap32BitModule;
pub use noexec::NoexecModule;
pub use segvguard::SegvguardModule;
