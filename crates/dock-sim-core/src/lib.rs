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

use num_traits::{PrimInt, Signed, Zero};
use std::{
    fmt::{Debug, Display},
    hash::Hash,
};

pub mod calendar;
pub mod err;
pub mod kernel;
pub mod queue;
pub mod sample;
pub mod space;
pub mod time;

/// The integer type simulated time is measured in.
pub trait SimVariable:
    PrimInt + Signed + Zero + Send + Sync + Debug + Display + Hash + 'static
{
}

impl<T> SimVariable for T where
    T: PrimInt + Signed + Zero + Send + Sync + Debug + Display + Hash + 'static
{
}

pub mod prelude {
    pub use crate::SimVariable;
    pub use crate::calendar::{Activation, EventCalendar};
    pub use crate::err::{ErrorKind, QueueFullError, Refusal};
    pub use crate::kernel::{InterruptCode, Kernel, ProcessId};
    pub use crate::queue::{QueueCapacity, QueueDiscipline, WaitQueue};
    pub use crate::sample::{
        ConstantSampler, DurationSampler, ExponentialSampler, SamplerError, UniformSampler,
    };
    pub use crate::space::SpaceLength;
    pub use crate::time::{TimeDelta, TimePoint};
}
