/*
 * Copyright 2024 Fluence Labs Limited
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

pub mod fake_system;
pub mod recording_apply;

pub use fake_system::FakeCat;
pub use fake_system::FakeCdp;
pub use fake_system::FakeKernel;
pub use fake_system::FakeMba;
pub use fake_system::FakeMbaCtrl;
pub use fake_system::FakeSystem;
pub use fake_system::FakeSystemBuilder;
pub use recording_apply::RecordingApply;
