// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in [`ReportRenderer`](crate::collab::ReportRenderer) implementations.

mod json;
mod junit;
mod multi;
mod summary;

pub use json::*;
pub use junit::*;
pub use multi::*;
pub use summary::*;
