//! CPU texture backend. Textures are plain RGBA copies; used headless and in
//! tests, where it also reports how many textures are alive.

use super::{SamplerDesc, TextureBackend};
use image::RgbaImage;
use log::info;
use std::error::Error;

#[derive(Debug, Clone)]
pub struct Texture {
    pub image: RgbaImage,
    sampler: SamplerDesc,
}

impl Texture {
    pub const fn sampler(&self) -> SamplerDesc {
        self.sampler
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

#[derive(Debug, Default)]
pub struct Backend {
    live: usize,
    created: usize,
    max_dimension: Option<u32>,
}

impl Backend {
    pub fn new() -> Self {
        info!("Initializing software texture backend...");
        Self::default()
    }

    /// Rejects textures larger than `max` on either axis, like a GPU with a
    /// small texture limit would.
    pub fn with_max_dimension(max: u32) -> Self {
        Self {
            max_dimension: Some(max),
            ..Self::default()
        }
    }

    pub const fn live_textures(&self) -> usize {
        self.live
    }

    pub const fn created_textures(&self) -> usize {
        self.created
    }
}

impl TextureBackend for Backend {
    type Texture = Texture;

    fn create_texture(
        &mut self,
        image: &RgbaImage,
        sampler: SamplerDesc,
    ) -> Result<Texture, Box<dyn Error>> {
        let (w, h) = image.dimensions();
        if let Some(max) = self.max_dimension
            && (w > max || h > max)
        {
            return Err(format!("texture {w}x{h} exceeds limit {max}").into());
        }
        self.live += 1;
        self.created += 1;
        Ok(Texture {
            image: image.clone(),
            sampler,
        })
    }

    fn destroy_texture(&mut self, texture: Texture) {
        self.live = self.live.saturating_sub(1);
        drop(texture);
    }
}
