pub mod software;

use image::RgbaImage;
use std::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SamplerFilter {
    Linear,
    Nearest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SamplerWrap {
    Clamp,
    Repeat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SamplerDesc {
    pub filter: SamplerFilter,
    pub wrap: SamplerWrap,
    pub mipmaps: bool,
}

impl Default for SamplerDesc {
    #[inline(always)]
    fn default() -> Self {
        Self {
            filter: SamplerFilter::Linear,
            wrap: SamplerWrap::Clamp,
            mipmaps: false,
        }
    }
}

/// The renderer-side texture factory. Only the thread that owns the renderer
/// may call into it; art workers hand over plain [`RgbaImage`]s instead.
pub trait TextureBackend {
    type Texture;

    fn create_texture(
        &mut self,
        image: &RgbaImage,
        sampler: SamplerDesc,
    ) -> Result<Self::Texture, Box<dyn Error>>;

    /// Releases a texture. Backends whose handles clean up on drop can keep
    /// the default.
    fn destroy_texture(&mut self, texture: Self::Texture) {
        drop(texture);
    }
}
