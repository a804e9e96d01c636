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
    berth::BerthError, config::ConfigError, control::ControlError, coop::CoopError,
    holding::LaneError, pool::PoolError, yard::YardError,
};
use dock_sim_core::{
    err::{ErrorKind, Refusal},
    kernel::ProcessId,
};
use dock_sim_model::{err::EntityError, id::TransporterId};
use std::fmt::Display;

/// Anything that stops a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    Config(ConfigError),
    Entity(EntityError),
    Berth(BerthError),
    Yard(YardError),
    Coop(CoopError),
    Lane(LaneError),
    Pool(PoolError),
    Control(ControlError),
    UnknownProcess(ProcessId),
    UnknownEntity { kind: &'static str, id: u64 },
    MissingJob(TransporterId),
}

impl Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::Config(e) => write!(f, "Invalid configuration: {}", e),
            SimError::Entity(e) => write!(f, "{}", e),
            SimError::Berth(e) => write!(f, "{}", e),
            SimError::Yard(e) => write!(f, "{}", e),
            SimError::Coop(e) => write!(f, "{}", e),
            SimError::Lane(e) => write!(f, "{}", e),
            SimError::Pool(e) => write!(f, "{}", e),
            SimError::Control(e) => write!(f, "{}", e),
            SimError::UnknownProcess(p) => write!(f, "{} was activated but never spawned", p),
            SimError::UnknownEntity { kind, id } => write!(f, "No {} with id {}", kind, id),
            SimError::MissingJob(t) => write!(f, "{} is driving without a job", t),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::Config(e) => Some(e),
            SimError::Entity(e) => Some(e),
            SimError::Berth(e) => Some(e),
            SimError::Yard(e) => Some(e),
            SimError::Coop(e) => Some(e),
            SimError::Lane(e) => Some(e),
            SimError::Pool(e) => Some(e),
            SimError::Control(e) => Some(e),
            _ => None,
        }
    }
}

impl Refusal for SimError {
    fn kind(&self) -> ErrorKind {
        match self {
            SimError::Config(e) => e.kind(),
            SimError::Entity(e) => e.kind(),
            SimError::Berth(e) => e.kind(),
            SimError::Yard(e) => e.kind(),
            SimError::Coop(e) => e.kind(),
            SimError::Lane(e) => e.kind(),
            SimError::Pool(e) => e.kind(),
            SimError::Control(e) => e.kind(),
            SimError::UnknownProcess(_)
            | SimError::UnknownEntity { .. }
            | SimError::MissingJob(_) => ErrorKind::WrongParticipant,
        }
    }
}

macro_rules! from_error {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for SimError {
                fn from(e: $ty) -> Self {
                    SimError::$variant(e)
                }
            }
        )*
    };
}

from_error!(
    Config(ConfigError),
    Entity(EntityError),
    Berth(BerthError),
    Yard(YardError),
    Coop(CoopError),
    Lane(LaneError),
    Pool(PoolError),
    Control(ControlError),
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_wrapped_errors_keep_kind_and_source() {
        let e: SimError = PoolError::DemandQueueFull { capacity: 2 }.into();
        assert_eq!(e.kind(), ErrorKind::QueueFull);
        assert!(e.source().is_some());
        let e = SimError::UnknownProcess(ProcessId::new(4));
        assert_eq!(e.kind(), ErrorKind::WrongParticipant);
        assert!(e.source().is_none());
        assert_eq!(e.to_string(), "ProcessId(4) was activated but never spawned");
    }
}
