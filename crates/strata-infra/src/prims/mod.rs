// Copyright 2025 eraflo
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

//! Primitives of the stream backend.

mod camera;
mod draw_target;
mod geometry;
mod light;
mod shader;
mod texture;

pub use camera::{StreamCamera, DIRTY_MATRICES};
pub use draw_target::{DrawTargetParams, StreamDrawTarget};
pub use geometry::{GeomStyle, GeometryKind, ReprDesc, StreamRprim, CURVE_REFINE_LEVEL};
pub use light::StreamLight;
pub use shader::{ShaderProgram, StreamShader, FALLBACK_SURFACE_SOURCE};
pub use texture::{StreamTexture, TextureResource};
