// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use crate::{
    err::EntityError,
    id::{BerthId, ShipId},
};
use dock_sim_core::{kernel::ProcessId, space::SpaceLength};
use tracing::warn;

/// A vessel that occupies berth length and is served by one or more cranes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ship {
    id: ShipId,
    process: ProcessId,
    length: SpaceLength,
    cranes_required: usize,
    to_unload: u64,
    to_load: u64,
    berth: Option<BerthId>,
}

impl Ship {
    /// Creates a ship. A crane demand of zero is raised to one.
    pub fn new(
        id: ShipId,
        process: ProcessId,
        length: SpaceLength,
        cranes_required: usize,
        to_unload: u64,
        to_load: u64,
    ) -> Result<Self, EntityError> {
        if length.is_zero() {
            return Err(EntityError::ZeroShipLength(id));
        }
        let cranes_required = if cranes_required == 0 {
            warn!(ship = %id, "ship requests no cranes, using one");
            1
        } else {
            cranes_required
        };
        Ok(Self {
            id,
            process,
            length,
            cranes_required,
            to_unload,
            to_load,
            berth: None,
        })
    }

    #[inline]
    pub fn id(&self) -> ShipId {
        self.id
    }

    #[inline]
    pub fn process(&self) -> ProcessId {
        self.process
    }

    #[inline]
    pub fn length(&self) -> SpaceLength {
        self.length
    }

    #[inline]
    pub fn cranes_required(&self) -> usize {
        self.cranes_required
    }

    /// Containers still on board that have to be discharged.
    #[inline]
    pub fn to_unload(&self) -> u64 {
        self.to_unload
    }

    /// Containers still waiting on the quay side to be loaded.
    #[inline]
    pub fn to_load(&self) -> u64 {
        self.to_load
    }

    #[inline]
    pub fn berth(&self) -> Option<BerthId> {
        self.berth
    }

    #[inline]
    pub fn moor(&mut self, berth: BerthId) {
        self.berth = Some(berth);
    }

    #[inline]
    pub fn unmoor(&mut self) -> Option<BerthId> {
        self.berth.take()
    }

    /// Books the work a crane reports back after its assignment.
    pub fn record_service(&mut self, unloaded: u64, loaded: u64) {
        self.to_unload = self.to_unload.saturating_sub(unloaded);
        self.to_load = self.to_load.saturating_sub(loaded);
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.to_unload == 0 && self.to_load == 0
    }
}
