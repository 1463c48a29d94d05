//! Animation baking (sparse keyframe channels -> dense 30 Hz local matrices)

mod baker;
mod channel;

pub use baker::{bake_animation, sample_count, BakedAnimation};
pub use channel::{parse_target, AnimationChannel, ChannelTarget, Interpolation};
