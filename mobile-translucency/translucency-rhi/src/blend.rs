//! Fixed-function blend state, plus a per-pixel CPU evaluation used to reason about compositing.

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWrites: u8 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
        const RGB = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits();
        const ALL = Self::RGB.bits() | Self::ALPHA.bits();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstColor,
    OneMinusDstColor,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOp {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponent {
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    pub operation: BlendOp,
}

impl BlendComponent {
    pub const REPLACE: Self = Self::new(BlendOp::Add, BlendFactor::One, BlendFactor::Zero);

    pub const fn new(operation: BlendOp, src_factor: BlendFactor, dst_factor: BlendFactor) -> Self {
        Self { src_factor, dst_factor, operation }
    }

    /// `channel` selects which colour channel the `*Color` factors read; for alpha pass 3.
    fn evaluate(&self, src: [f32; 4], dst: [f32; 4], channel: usize) -> f32 {
        let s = src[channel] * factor_value(self.src_factor, src, dst, channel);
        let d = dst[channel] * factor_value(self.dst_factor, src, dst, channel);
        match self.operation {
            BlendOp::Add => s + d,
            BlendOp::Subtract => s - d,
            BlendOp::ReverseSubtract => d - s,
            BlendOp::Min => src[channel].min(dst[channel]),
            BlendOp::Max => src[channel].max(dst[channel]),
        }
    }
}

fn factor_value(factor: BlendFactor, src: [f32; 4], dst: [f32; 4], channel: usize) -> f32 {
    match factor {
        BlendFactor::Zero => 0.0,
        BlendFactor::One => 1.0,
        BlendFactor::SrcColor => src[channel],
        BlendFactor::OneMinusSrcColor => 1.0 - src[channel],
        BlendFactor::SrcAlpha => src[3],
        BlendFactor::OneMinusSrcAlpha => 1.0 - src[3],
        BlendFactor::DstColor => dst[channel],
        BlendFactor::OneMinusDstColor => 1.0 - dst[channel],
        BlendFactor::DstAlpha => dst[3],
        BlendFactor::OneMinusDstAlpha => 1.0 - dst[3],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    pub color: BlendComponent,
    pub alpha: BlendComponent,
}

impl BlendState {
    pub const REPLACE: Self = Self { color: BlendComponent::REPLACE, alpha: BlendComponent::REPLACE };
}

/// Blend and write mask of the single colour target the translucency passes bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorTargetBlend {
    pub write_mask: ColorWrites,
    /// `None` writes the source unchanged.
    pub blend: Option<BlendState>,
}

impl ColorTargetBlend {
    pub const OPAQUE: Self = Self { write_mask: ColorWrites::ALL, blend: None };
    pub const NO_COLOR_WRITES: Self = Self { write_mask: ColorWrites::empty(), blend: None };

    /// Evaluate this blend on a single pixel: `src` is the shader output, `dst` the stored value.
    pub fn apply(&self, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
        let blended = match self.blend {
            Some(state) => [
                state.color.evaluate(src, dst, 0),
                state.color.evaluate(src, dst, 1),
                state.color.evaluate(src, dst, 2),
                state.alpha.evaluate(src, dst, 3),
            ],
            None => src,
        };
        let masks = [ColorWrites::RED, ColorWrites::GREEN, ColorWrites::BLUE, ColorWrites::ALPHA];
        let mut out = dst;
        for (i, mask) in masks.iter().enumerate() {
            if self.write_mask.contains(*mask) {
                out[i] = blended[i];
            }
        }
        out
    }
}
