/*!
 * Policy Module
 * Flag codec, state validators, request resolution, validation and activation
 */

pub mod activation;
pub mod flags;
pub mod registry;
pub mod resolver;
pub mod state;
pub mod traits;
pub mod validation;

pub use activation::{ActivationEngine, ActivationPhase, ActivationReport};
pub use flags::{has_conflict, is_known, FlagSet, Mitigation};
pub use registry::ModuleRegistry;
pub use resolver::{requested_flags, ImageParams};
pub use state::{FeatureState, FeatureStateKind, SimpleFeatureState, StateCheck};
pub use traits::{FeatureModule, Tunable};
pub use validation::{validate_request, validate_result};
