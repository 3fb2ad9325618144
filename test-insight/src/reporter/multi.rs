// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    collab::{RenderContext, ReportRenderer},
    errors::{DisplayErrorChain, RenderError},
};
use debug_ignore::DebugIgnore;
use tracing::warn;

/// Fans a report out to several renderers.
///
/// Every renderer runs even if an earlier one fails. The first error is returned; later errors are
/// logged.
#[derive(Debug, Default)]
pub struct MultiReporter {
    renderers: DebugIgnore<Vec<Box<dyn ReportRenderer>>>,
}

impl MultiReporter {
    /// Creates an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a renderer.
    pub fn push(&mut self, renderer: impl ReportRenderer + 'static) -> &mut Self {
        self.renderers.push(Box::new(renderer));
        self
    }

    /// Returns the number of renderers.
    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    /// Returns true if there are no renderers.
    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

impl ReportRenderer for MultiReporter {
    fn render(&self, cx: &RenderContext<'_>) -> Result<(), RenderError> {
        let mut first_error = None;
        for renderer in self.renderers.iter() {
            if let Err(error) = renderer.render(cx) {
                if first_error.is_none() {
                    first_error = Some(error);
                } else {
                    warn!(
                        "additional report renderer failed: {}",
                        DisplayErrorChain::new(&error)
                    );
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}
