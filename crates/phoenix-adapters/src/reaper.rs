//! Zombie reaping for detached children.
//!
//! Detached launches are never reported, but their process-table entries must
//! still be collected. Only children adopted here are waited on, so a reap can
//! never steal the exit status of the foreground session.

use std::process::Child;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct Reaper {
    children: Vec<Child>,
}

impl Reaper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of a detached child.
    pub fn adopt(&mut self, child: Child) {
        debug!(pid = child.id(), "Adopted detached child");
        self.children.push(child);
    }

    /// Collects every adopted child that has exited. Never blocks.
    ///
    /// Returns how many were reaped.
    pub fn reap(&mut self) -> usize {
        let before = self.children.len();
        self.children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                debug!(pid = child.id(), %status, "Reaped detached child");
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!(pid = child.id(), error = %e, "Failed to query detached child, dropping it");
                false
            }
        });
        before - self.children.len()
    }

    /// Number of adopted children not yet reaped.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
