//! Parameter validation and normalization
//!
//! Pure functions over raw user text. Every declared input type has a
//! rule that either yields a normalized JSON value or a structured
//! [`ValidationFailure`] naming the field and the violated rule.

mod input;
mod phone;
mod region;
mod text;
mod validator;

pub use input::{ChoiceOption, InputDeclaration, InputType};
pub use phone::{normalize_phone, PhoneError, DIAL_PREFIX};
pub use region::{lookup_region, region_name, RegionLookup, REGION_COUNT, WILAYAS};
pub use text::{collapse_whitespace, fold_accents, normalize_free_text};
pub use validator::{ParameterValidator, ValidationFailure, ValidationRule};
