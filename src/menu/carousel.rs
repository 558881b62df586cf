//! Selection state for the ROM carousel and the art requests it drives.
//! Drawing is left to the caller; this only decides what to load and what
//! to let go.

use super::library::RomEntry;
use crate::art::ArtManager;
use crate::config::Config;
use crate::core::gfx::TextureBackend;
use log::{debug, info};

/// Maps any signed position onto `0..len`.
#[inline(always)]
pub fn wrap(value: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    value.rem_euclid(len as isize) as usize
}

/// Steps between `a` and `b` going whichever way round is shorter.
#[inline(always)]
pub fn wrapped_distance(a: usize, b: usize, len: usize) -> usize {
    let d = a.abs_diff(b);
    d.min(len.saturating_sub(d))
}

/// 0, n-1, 1, n-2, ... so both ends of the list fill in first.
pub fn initial_load_order(len: usize) -> Vec<usize> {
    let mut order = Vec::with_capacity(len);
    for i in 0..len.div_ceil(2) {
        order.push(i);
        let mirror = len - 1 - i;
        if i < mirror {
            order.push(mirror);
        }
    }
    order
}

pub struct Carousel {
    roms: Vec<RomEntry>,
    active: isize,
    visible_range: usize,
    unload_distance: usize,
}

impl Carousel {
    pub fn new(roms: Vec<RomEntry>, visible_range: usize, unload_distance: usize) -> Self {
        Self {
            roms,
            active: 0,
            visible_range,
            unload_distance,
        }
    }

    pub fn from_config(roms: Vec<RomEntry>, cfg: &Config) -> Self {
        Self::new(roms, cfg.visible_range, cfg.unload_distance)
    }

    pub fn roms(&self) -> &[RomEntry] {
        &self.roms
    }

    pub fn len(&self) -> usize {
        self.roms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roms.is_empty()
    }

    pub fn selected_index(&self) -> Option<usize> {
        (!self.roms.is_empty()).then(|| wrap(self.active, self.roms.len()))
    }

    pub fn selected(&self) -> Option<&RomEntry> {
        self.selected_index().map(|i| &self.roms[i])
    }

    pub fn move_left(&mut self) {
        if !self.roms.is_empty() {
            self.active -= 1;
        }
    }

    pub fn move_right(&mut self) {
        if !self.roms.is_empty() {
            self.active += 1;
        }
    }

    /// Selected item first, then each neighbor pair outward (+1, -1, +2, ...).
    /// Short lists never repeat an index.
    pub fn visible_indices(&self) -> Vec<usize> {
        let len = self.roms.len();
        if len == 0 {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(self.visible_range * 2 + 1);
        out.push(wrap(self.active, len));
        for offset in 1..=self.visible_range as isize {
            for idx in [
                wrap(self.active + offset, len),
                wrap(self.active - offset, len),
            ] {
                if !out.contains(&idx) {
                    out.push(idx);
                }
            }
        }
        out
    }

    /// Queues art for the whole library at normal priority, outside-in.
    pub fn queue_initial_loads<B: TextureBackend>(&self, art: &mut ArtManager<B>) {
        if self.roms.is_empty() {
            return;
        }
        info!(
            "Starting background art load for {} ROM(s).",
            self.roms.len()
        );
        for idx in initial_load_order(self.roms.len()) {
            let rom = &self.roms[idx];
            art.submit(&rom.filename, &rom.display_name, false, false);
        }
    }

    /// Asks for display art around the selection at high priority. Items
    /// that already show art are skipped.
    pub fn request_visible<B: TextureBackend>(&self, art: &mut ArtManager<B>) {
        for idx in self.visible_indices() {
            let rom = &self.roms[idx];
            if !art.is_ready(&rom.filename) {
                art.submit(&rom.filename, &rom.display_name, true, false);
            }
        }
    }

    /// Releases textures of items further than the unload distance from the
    /// selection. Does nothing when the distance is 0. Returns how many
    /// entries were unloaded.
    pub fn unload_distant<B: TextureBackend>(
        &self,
        art: &mut ArtManager<B>,
        backend: &mut B,
    ) -> usize {
        let Some(selected) = self.selected_index() else {
            return 0;
        };
        if self.unload_distance == 0 {
            return 0;
        }
        let len = self.roms.len();
        let mut unloaded = 0;
        for (idx, rom) in self.roms.iter().enumerate() {
            if wrapped_distance(idx, selected, len) > self.unload_distance
                && art.is_ready(&rom.filename)
            {
                art.unload(backend, &rom.filename);
                unloaded += 1;
            }
        }
        if unloaded > 0 {
            debug!("Unloaded {unloaded} distant art entries.");
        }
        unloaded
    }

    /// Per-frame step: publish finished art, request what is visible, then
    /// trim what is far away.
    pub fn update<B: TextureBackend>(&self, art: &mut ArtManager<B>, backend: &mut B) {
        art.poll(backend);
        self.request_visible(art);
        self.unload_distant(art, backend);
    }
}
