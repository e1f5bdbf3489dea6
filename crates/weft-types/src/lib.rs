//! Property model for weft
//!
//! Defines the deployment properties a module forks on, the permutations
//! enumerated from them, and the module definition loaded from
//! `*.module.toml`. These types are shared by the precompile and link phases.

pub mod error;
pub mod module;
pub mod permutation;
pub mod property;

pub use error::ConfigError;
pub use module::{is_valid_deploy_path, parse_pin, ModuleDef, DEFAULT_LINKER};
pub use permutation::{Permutation, PermutationId, PropertyOracle};
pub use property::{BindingProperty, ConfigurationProperty, PropertyModel};
