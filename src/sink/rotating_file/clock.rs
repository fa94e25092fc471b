// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use jiff::Zoned;

#[derive(Debug)]
pub(super) enum Clock {
    DefaultClock,
    #[cfg(test)]
    ManualClock(ManualClock),
}

impl Clock {
    pub(super) fn now(&self) -> Zoned {
        match self {
            Clock::DefaultClock => Zoned::now(),
            #[cfg(test)]
            Clock::ManualClock(clock) => clock.now(),
        }
    }

    #[cfg(test)]
    pub(super) fn set_now(&mut self, new_time: Zoned) {
        if let Clock::ManualClock(clock) = self {
            clock.set_now(new_time);
        }
    }
}

/// The time could be reset.
#[derive(Debug)]
#[cfg(test)]
pub(super) struct ManualClock {
    now: Zoned,
}

#[cfg(test)]
impl ManualClock {
    pub(super) fn new(now: Zoned) -> ManualClock {
        ManualClock { now }
    }

    fn now(&self) -> Zoned {
        self.now.clone()
    }

    fn set_now(&mut self, now: Zoned) {
        self.now = now;
    }
}
