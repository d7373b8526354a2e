//! # plfm-image-ref
//!
//! Container image reference parsing and formatting for the plfm-vt platform.
//!
//! ## Reference Format
//!
//! `[registry/][namespace/]name[:tag][@digest]`
//!
//! Examples:
//! - `alpine` -> name only
//! - `quay.io/ocp-test/release:4.5` -> registry, namespace, name, tag
//! - `localhost:5000/team/app@sha256:...` -> registry with port, digest
//!
//! Parsing never applies Docker Hub defaults. The repository path of a
//! reference (everything but tag and digest) is formatted exactly as it was
//! written, which makes it usable as a matching key.

mod error;
mod reference;

pub use error::ReferenceError;
pub use reference::{ImageReference, DOCKER_HUB_REGISTRY, NAME_TOTAL_LENGTH_MAX};
