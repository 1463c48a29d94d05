//! Keyframe channels: target parsing, validation and cursor sampling

use crate::document::{ChannelDesc, StridedDesc};
use crate::error::{BakeError, BakeResult};

/// Per-segment interpolation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
    Bezier,
}

impl Interpolation {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "LINEAR" => Some(Self::Linear),
            "STEP" => Some(Self::Step),
            "BEZIER" => Some(Self::Bezier),
            _ => None,
        }
    }
}

/// Parsed `node/sid.COMPONENT` address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTarget {
    pub node: String,
    /// `None` when the address has no `/`
    pub sid: Option<String>,
    /// First parameter written within the targeted element
    pub component: usize,
}

/// Parse a channel target address.
///
/// `X`, `Y`, `Z` and `ANGLE` map to components 0..=3, `(i)` to `i` and
/// `(i)(j)` to `i + 4 * j`. A bare `node/sid` addresses the whole element.
pub fn parse_target(channel: &str, target: &str) -> BakeResult<ChannelTarget> {
    let Some((node, rest)) = target.split_once('/') else {
        return Ok(ChannelTarget {
            node: target.to_string(),
            sid: None,
            component: 0,
        });
    };

    let split = rest.find(['.', '(']).unwrap_or(rest.len());
    let (sid, suffix) = rest.split_at(split);

    let unsupported = || BakeError::UnsupportedTargetComponent {
        channel: channel.to_string(),
        component: suffix.to_string(),
    };

    let component = if suffix.is_empty() {
        0
    } else if let Some(name) = suffix.strip_prefix('.') {
        match name {
            "X" => 0,
            "Y" => 1,
            "Z" => 2,
            "ANGLE" => 3,
            _ => return Err(unsupported()),
        }
    } else {
        let mut indices = suffix
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(unsupported)?
            .split(")(")
            .map(|i| i.parse::<usize>().map_err(|_| unsupported()));
        let i = indices.next().ok_or_else(unsupported)??;
        let j = indices.next().transpose()?.unwrap_or(0);
        if indices.next().is_some() {
            return Err(unsupported());
        }
        i + 4 * j
    };

    Ok(ChannelTarget {
        node: node.to_string(),
        sid: Some(sid.to_string()),
        component,
    })
}

/// Validated keyframe channel with a forward-only sampling cursor
#[derive(Debug, Clone)]
pub struct AnimationChannel<'a> {
    pub id: &'a str,
    pub target: ChannelTarget,
    times: &'a [f32],
    values: &'a [f32],
    stride: usize,
    in_tangent: Option<&'a StridedDesc>,
    out_tangent: Option<&'a StridedDesc>,
    interpolation: Vec<Interpolation>,
    cursor: usize,
}

impl<'a> AnimationChannel<'a> {
    pub fn from_desc(desc: &'a ChannelDesc) -> BakeResult<Self> {
        let id = if desc.id.is_empty() {
            desc.target.as_str()
        } else {
            desc.id.as_str()
        };
        let invalid = |reason: String| BakeError::InvalidKeyframes {
            channel: id.to_string(),
            reason,
        };

        let interpolation = desc
            .interpolation
            .iter()
            .map(|name| {
                Interpolation::parse(name).ok_or_else(|| BakeError::UnsupportedInterpolation {
                    channel: id.to_string(),
                    name: name.clone(),
                })
            })
            .collect::<BakeResult<Vec<_>>>()?;

        let target = parse_target(id, &desc.target)?;

        let keys = desc.input.len();
        if keys == 0 {
            return Err(invalid("no keyframes".into()));
        }
        if let Some(w) = desc
            .input
            .windows(2)
            .position(|w| w[1].partial_cmp(&w[0]) != Some(std::cmp::Ordering::Greater))
        {
            return Err(invalid(format!(
                "keyframe times not strictly increasing at key {}",
                w + 1
            )));
        }

        let stride = desc.output.stride;
        if stride == 0 || desc.output.data.len() != keys * stride {
            return Err(invalid(format!(
                "expected {} output values ({} keys, stride {}), found {}",
                keys * stride,
                keys,
                stride,
                desc.output.data.len()
            )));
        }
        if interpolation.len() != keys {
            return Err(invalid(format!(
                "expected {} interpolation entries, found {}",
                keys,
                interpolation.len()
            )));
        }

        let has_bezier = interpolation[..keys - 1].contains(&Interpolation::Bezier);
        if has_bezier {
            for (name, tangent) in [("in", &desc.in_tangent), ("out", &desc.out_tangent)] {
                let Some(tangent) = tangent else {
                    return Err(invalid(format!("BEZIER segment without {name} tangents")));
                };
                if tangent.stride != stride * 2 || tangent.data.len() != keys * tangent.stride {
                    return Err(invalid(format!(
                        "{name} tangents need stride {} and {} values",
                        stride * 2,
                        keys * stride * 2
                    )));
                }
            }
        }

        Ok(Self {
            id,
            target,
            times: &desc.input,
            values: &desc.output.data,
            stride,
            in_tangent: desc.in_tangent.as_ref(),
            out_tangent: desc.out_tangent.as_ref(),
            interpolation,
            cursor: 0,
        })
    }

    /// Number of components written per sample
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Time of the last keyframe
    pub fn duration(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Evaluate the channel at `t` into `out[..stride]`.
    ///
    /// Sample times must not decrease between calls. Returns `false` and
    /// leaves `out` untouched once `t` lies past the last segment.
    pub fn sample(&mut self, t: f32, out: &mut [f32]) -> bool {
        let keys = self.times.len();
        let stride = self.stride;

        if keys == 1 {
            out[..stride].copy_from_slice(&self.values[..stride]);
            return true;
        }

        while self.cursor + 1 < keys && self.times[self.cursor + 1] < t {
            self.cursor += 1;
        }
        let key = self.cursor;
        if key + 1 >= keys {
            return false;
        }

        let (t0, t1) = (self.times[key], self.times[key + 1]);
        let mix = (t - t0) / (t1 - t0);
        if mix > 1.0 {
            return false;
        }

        let v0 = &self.values[key * stride..(key + 1) * stride];
        let v1 = &self.values[(key + 1) * stride..(key + 2) * stride];

        match self.interpolation[key] {
            Interpolation::Step => out[..stride].copy_from_slice(v0),
            Interpolation::Linear => {
                for c in 0..stride {
                    out[c] = v0[c] * (1.0 - mix) + v1[c] * mix;
                }
            }
            Interpolation::Bezier => {
                // Validated in from_desc
                let (Some(tin), Some(tout)) = (self.in_tangent, self.out_tangent) else {
                    return false;
                };
                let inv = 1.0 - mix;
                let basis = [
                    inv * inv * inv,
                    3.0 * mix * inv * inv,
                    3.0 * mix * mix * inv,
                    mix * mix * mix,
                ];
                for c in 0..stride {
                    let p1 = tout.data[key * tout.stride + c * 2 + 1];
                    let p2 = tin.data[(key + 1) * tin.stride + c * 2 + 1];
                    out[c] = basis[0] * v0[c] + basis[1] * p1 + basis[2] * p2 + basis[3] * v1[c];
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(times: &[f32], values: &[f32], stride: usize, interp: &str) -> ChannelDesc {
        ChannelDesc {
            id: "ch".into(),
            target: "node/location.X".into(),
            input: times.to_vec(),
            output: StridedDesc {
                stride,
                data: values.to_vec(),
            },
            in_tangent: None,
            out_tangent: None,
            interpolation: vec![interp.to_string(); times.len()],
        }
    }

    #[test]
    fn test_parse_target_components() {
        let t = parse_target("c", "hips/rotX.ANGLE").unwrap();
        assert_eq!(t.node, "hips");
        assert_eq!(t.sid.as_deref(), Some("rotX"));
        assert_eq!(t.component, 3);

        assert_eq!(parse_target("c", "n/loc.Y").unwrap().component, 1);
        assert_eq!(parse_target("c", "n/m(3)").unwrap().component, 3);
        assert_eq!(parse_target("c", "n/m(3)(2)").unwrap().component, 11);

        let whole = parse_target("c", "n/transform").unwrap();
        assert_eq!(whole.sid.as_deref(), Some("transform"));
        assert_eq!(whole.component, 0);

        let bare = parse_target("c", "n").unwrap();
        assert!(bare.sid.is_none());
    }

    #[test]
    fn test_parse_target_rejects_unknown_component() {
        for bad in ["n/loc.W", "n/m(x)", "n/m(1)(2)(3)", "n/m(1"] {
            assert!(
                matches!(
                    parse_target("c", bad),
                    Err(BakeError::UnsupportedTargetComponent { .. })
                ),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_linear_midpoint() {
        let desc = channel(&[0.0, 1.0], &[0.0, 10.0], 1, "LINEAR");
        let mut ch = AnimationChannel::from_desc(&desc).unwrap();
        let mut out = [0.0];
        assert!(ch.sample(0.5, &mut out));
        assert_eq!(out[0], 5.0);
    }

    #[test]
    fn test_past_range_keeps_last_value() {
        let desc = channel(&[0.0, 1.0], &[0.0, 10.0], 1, "LINEAR");
        let mut ch = AnimationChannel::from_desc(&desc).unwrap();
        let mut out = [0.0];
        assert!(ch.sample(0.5, &mut out));
        assert!(!ch.sample(1.2, &mut out));
        assert_eq!(out[0], 5.0);
    }

    #[test]
    fn test_exact_last_key_is_evaluated() {
        let desc = channel(&[0.0, 1.0], &[0.0, 10.0], 1, "LINEAR");
        let mut ch = AnimationChannel::from_desc(&desc).unwrap();
        let mut out = [0.0];
        assert!(ch.sample(1.0, &mut out));
        assert_eq!(out[0], 10.0);
    }

    #[test]
    fn test_step_holds_start_value() {
        let desc = channel(&[0.0, 1.0, 2.0], &[3.0, 7.0, 11.0], 1, "STEP");
        let mut ch = AnimationChannel::from_desc(&desc).unwrap();
        let mut out = [0.0];
        for t in [0.0, 0.25, 0.5, 0.999] {
            assert!(ch.sample(t, &mut out));
            assert_eq!(out[0], 3.0, "t={t}");
        }
        assert!(ch.sample(1.5, &mut out));
        assert_eq!(out[0], 7.0);
    }

    #[test]
    fn test_bezier_with_linear_tangents_matches_linear() {
        let mut desc = channel(&[0.0, 1.0], &[0.0, 3.0], 1, "BEZIER");
        // control points at 1/3 and 2/3 of the value range
        desc.out_tangent = Some(StridedDesc {
            stride: 2,
            data: vec![0.333, 1.0, 1.333, 4.0],
        });
        desc.in_tangent = Some(StridedDesc {
            stride: 2,
            data: vec![-0.333, -1.0, 0.667, 2.0],
        });
        let mut ch = AnimationChannel::from_desc(&desc).unwrap();
        let mut out = [0.0];
        for t in [0.0f32, 0.25, 0.5, 0.75, 1.0] {
            assert!(ch.sample(t, &mut out));
            assert!((out[0] - 3.0 * t).abs() < 1e-5, "t={t}: {}", out[0]);
        }
    }

    #[test]
    fn test_bezier_reads_each_component_control_point() {
        let mut desc = channel(&[0.0, 1.0], &[0.0, 10.0, -4.0, 3.0, 20.0, -8.0], 3, "BEZIER");
        desc.target = "node/location".into();
        // (time, value) pairs per component
        desc.out_tangent = Some(StridedDesc {
            stride: 6,
            data: vec![0.3, 1.0, 0.3, 10.0, 0.3, 0.0, 1.3, 9.0, 1.3, 9.0, 1.3, 9.0],
        });
        desc.in_tangent = Some(StridedDesc {
            stride: 6,
            data: vec![-0.3, 9.0, -0.3, 9.0, -0.3, 9.0, 0.7, 2.0, 0.7, 20.0, 0.7, -8.0],
        });
        let mut ch = AnimationChannel::from_desc(&desc).unwrap();
        let mut out = [0.0; 3];

        assert!(ch.sample(0.0, &mut out));
        assert_eq!(out, [0.0, 10.0, -4.0]);

        // basis at m = 0.5 is [1, 3, 3, 1] / 8
        assert!(ch.sample(0.5, &mut out));
        assert!((out[0] - 1.5).abs() < 1e-5, "x: {}", out[0]);
        assert!((out[1] - 15.0).abs() < 1e-5, "y: {}", out[1]);
        assert!((out[2] + 4.5).abs() < 1e-5, "z: {}", out[2]);

        assert!(ch.sample(1.0, &mut out));
        assert_eq!(out, [3.0, 20.0, -8.0]);
    }

    #[test]
    fn test_single_key_always_applies() {
        let desc = channel(&[0.5], &[1.0, 2.0, 3.0], 3, "LINEAR");
        let mut ch = AnimationChannel::from_desc(&desc).unwrap();
        let mut out = [0.0; 3];
        assert!(ch.sample(0.0, &mut out));
        assert!(ch.sample(9.0, &mut out));
        assert_eq!(out, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_sampling_is_deterministic() {
        let desc = channel(&[0.0, 0.4, 1.3], &[0.0, 2.5, -1.0], 1, "LINEAR");
        let run = || {
            let mut ch = AnimationChannel::from_desc(&desc).unwrap();
            let mut out = [0.0];
            (0..45)
                .map(|k| {
                    ch.sample(k as f32 / 30.0, &mut out);
                    out[0].to_bits()
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_unsupported_interpolation() {
        let desc = channel(&[0.0, 1.0], &[0.0, 1.0], 1, "HERMITE");
        assert!(matches!(
            AnimationChannel::from_desc(&desc).unwrap_err(),
            BakeError::UnsupportedInterpolation { ref name, .. } if name == "HERMITE"
        ));
    }

    #[test]
    fn test_keyframe_validation() {
        let desc = channel(&[0.0, 0.0], &[0.0, 1.0], 1, "LINEAR");
        assert!(matches!(
            AnimationChannel::from_desc(&desc).unwrap_err(),
            BakeError::InvalidKeyframes { .. }
        ));

        let desc = channel(&[0.0, 1.0], &[0.0], 1, "LINEAR");
        assert!(AnimationChannel::from_desc(&desc).is_err());

        let desc = channel(&[], &[], 1, "LINEAR");
        assert!(AnimationChannel::from_desc(&desc).is_err());

        // BEZIER without tangents
        let desc = channel(&[0.0, 1.0], &[0.0, 1.0], 1, "BEZIER");
        assert!(AnimationChannel::from_desc(&desc).is_err());
    }
}
