//! Cross-field invariant checks executed before any mutation is persisted.
//!
//! The whole rule set is evaluated, not fail-fast; every violated rule ends up
//! in one aggregated error.

use std::{fmt::Display, sync::LazyLock};

use const_format::concatcp;
use regex::Regex;
use snafu::Snafu;

use crate::crd::AppComponent;

const QUANTITY_NUMBER_FMT: &str = "[+-]?[0-9.]+";
const QUANTITY_SUFFIX_FMT: &str = "[eEinumkKMGTP]*[-+]?[0-9]*";

/// The shared Kubernetes resource quantity grammar: optional sign, digits and
/// decimal point, optional unit/exponent suffix.
pub const QUANTITY_FMT: &str = concatcp!(
    "^(",
    QUANTITY_NUMBER_FMT,
    ")(",
    QUANTITY_SUFFIX_FMT,
    ")$"
);

static QUANTITY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(QUANTITY_FMT).expect("failed to compile quantity regex"));

type Result<T = (), E = Errors> = std::result::Result<T, E>;

/// A collection of errors discovered during validation.
#[derive(Debug)]
pub struct Errors(Vec<Error>);

impl Display for Errors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "validation failed: ")?;
        for (i, error) in self.0.iter().enumerate() {
            let prefix = match i {
                0 => "",
                _ => ", ",
            };
            write!(f, "{prefix}{error}")?;
        }
        Ok(())
    }
}
impl std::error::Error for Errors {}

/// A single validation error.
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("must set the field(s): {}", fields.join(", ")))]
    RequiredFields { fields: Vec<String> },

    #[snafu(display(
        "cannot parse '{value}': quantities must match the regular expression '{QUANTITY_FMT}'"
    ))]
    InvalidQuantity { value: String },
}

/// Validates the component's cross-field invariants.
///
/// Currently there is a single rule set: when StatefulSet storage is
/// configured without a full claim template, its size must be present and be a
/// parseable resource quantity.
pub fn validate(component: &AppComponent) -> Result {
    let mut errors = Vec::new();
    let mut required = Vec::new();

    if let Some(storage) = component
        .spec
        .stateful_set
        .as_ref()
        .and_then(|stateful_set| stateful_set.storage.as_ref())
        .filter(|storage| storage.volume_claim_template.is_none())
    {
        match storage.size.as_deref() {
            None | Some("") => required.push("spec.statefulSet.storage.size".to_owned()),
            Some(size) if !QUANTITY_REGEX.is_match(size) => {
                errors.push(Error::InvalidQuantity {
                    value: size.to_owned(),
                });
            }
            Some(_) => (),
        }
    }

    if !required.is_empty() {
        errors.insert(0, Error::RequiredFields { fields: required });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Errors(errors))
    }
}
