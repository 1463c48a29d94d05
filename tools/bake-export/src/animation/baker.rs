//! Fixed-rate resampling of keyframe channels into local matrices

use bake_common::formats::BAKE_FORMAT;
use glam::Mat4;

use super::channel::AnimationChannel;
use crate::document::SceneDocument;
use crate::error::{BakeError, BakeResult};
use crate::transform::TransformStack;

/// Absorbs f32 error in `duration * rate` so a key landing on a sample
/// boundary still gets its own sample
const SAMPLE_EPSILON: f32 = 1e-3;

/// Dense local matrices of every animated node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BakedAnimation {
    /// Seconds between samples
    pub sample_period: f32,
    /// Time of the latest keyframe over all bound channels
    pub duration: f32,
    pub sample_count: usize,
    /// Node indices in first-reference order
    pub animated_nodes: Vec<usize>,
    /// `[sample][slot]`, flattened
    pub locals: Vec<Mat4>,
}

impl BakedAnimation {
    pub fn slot_of(&self, node: usize) -> Option<usize> {
        self.animated_nodes.iter().position(|&n| n == node)
    }

    pub fn local(&self, sample: usize, slot: usize) -> Mat4 {
        self.locals[sample * self.animated_nodes.len() + slot]
    }

    /// All slot matrices of one sample
    pub fn frame(&self, sample: usize) -> &[Mat4] {
        let n = self.animated_nodes.len();
        &self.locals[sample * n..(sample + 1) * n]
    }
}

/// Channel bound to a concrete transform element
struct BoundChannel<'a> {
    channel: AnimationChannel<'a>,
    slot: usize,
    element: usize,
}

/// Number of samples covering `[0, duration]` at `rate` Hz, both ends included.
pub fn sample_count(duration: f32, rate: u32) -> usize {
    (duration * rate as f32 + SAMPLE_EPSILON).floor() as usize + 1
}

/// Bake every channel of `doc` against the idle transform stacks.
///
/// Channels that target an unknown node, have no sid, or name a sid the
/// node does not carry are skipped with a warning. Working stacks start from
/// the idle stacks and persist across samples, so a channel that has run
/// past its last segment keeps the last value it wrote.
pub fn bake_animation(doc: &SceneDocument, stacks: &[TransformStack]) -> BakeResult<BakedAnimation> {
    let rate = BAKE_FORMAT.sample_rate;
    let period = BAKE_FORMAT.sample_period();

    // Every channel is validated before anything is sampled
    let channels = doc
        .animations
        .iter()
        .map(AnimationChannel::from_desc)
        .collect::<BakeResult<Vec<_>>>()?;

    let mut animated_nodes: Vec<usize> = Vec::new();
    let mut bound: Vec<BoundChannel<'_>> = Vec::new();

    for channel in channels {
        let Some(node) = doc.node_index(&channel.target.node) else {
            tracing::warn!(
                "Channel '{}': target node '{}' not found, skipping",
                channel.id,
                channel.target.node
            );
            continue;
        };
        let Some(sid) = channel.target.sid.as_deref() else {
            tracing::warn!("Channel '{}': target has no sid, skipping", channel.id);
            continue;
        };
        let Some(element) = stacks[node].find_sid(sid) else {
            tracing::warn!(
                "Channel '{}': node '{}' has no transform '{}', skipping",
                channel.id,
                channel.target.node,
                sid
            );
            continue;
        };

        let params = stacks[node].elements()[element].op.params().len();
        let end = channel.target.component + channel.stride();
        if end > params {
            return Err(BakeError::InvalidKeyframes {
                channel: channel.id.to_string(),
                reason: format!(
                    "writes components {}..{} of '{}' which has {}",
                    channel.target.component, end, sid, params
                ),
            });
        }

        let slot = match animated_nodes.iter().position(|&n| n == node) {
            Some(slot) => slot,
            None => {
                animated_nodes.push(node);
                animated_nodes.len() - 1
            }
        };
        bound.push(BoundChannel {
            channel,
            slot,
            element,
        });
    }

    if bound.is_empty() {
        return Ok(BakedAnimation {
            sample_period: period,
            ..Default::default()
        });
    }

    let duration = bound
        .iter()
        .map(|b| b.channel.duration())
        .fold(0.0f32, f32::max);
    let samples = sample_count(duration, rate);

    let mut working: Vec<TransformStack> =
        animated_nodes.iter().map(|&n| stacks[n].clone()).collect();
    let mut locals = Vec::with_capacity(samples * animated_nodes.len());
    let mut scratch = [0f32; 16];

    for k in 0..samples {
        let t = k as f32 / rate as f32;
        for b in &mut bound {
            let stride = b.channel.stride();
            if !b.channel.sample(t, &mut scratch[..stride]) {
                continue;
            }
            let component = b.channel.target.component;
            if let Some(element) = working[b.slot].element_mut(b.element) {
                element.op.params_mut()[component..component + stride]
                    .copy_from_slice(&scratch[..stride]);
            }
        }
        locals.extend(working.iter().map(TransformStack::compose));
    }

    tracing::info!(
        "Baked animation: {} nodes, {} channels, {} samples over {:.3}s",
        animated_nodes.len(),
        bound.len(),
        samples,
        duration
    );

    Ok(BakedAnimation {
        sample_period: period,
        duration,
        sample_count: samples,
        animated_nodes,
        locals,
    })
}
