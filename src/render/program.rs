use crate::effects::filter::{BlendMode, DrawState};
use xxhash_rust::xxh3::Xxh3;

const XXH3_SEED: u64 = 0x5f3a_91c2_e07b_d4a1;

/// Content-hash identity of a compiled filter program for one surface layout.
///
/// Equal keys mean a device may reuse whatever it compiled for the first draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramKey(pub u64);

/// Per-pipeline program key builder.
///
/// Keys are derived from content, so two pipelines agree on a key without sharing any counter.
#[derive(Clone, Debug)]
pub(crate) struct ProgramKeys {
    seed: u64,
}

impl Default for ProgramKeys {
    fn default() -> Self {
        Self { seed: XXH3_SEED }
    }
}

impl ProgramKeys {
    pub(crate) fn key(
        &self,
        shader_label: &str,
        state: DrawState,
        legacy: bool,
        samples: u8,
    ) -> ProgramKey {
        let mut h = StableHasher::new(self.seed);
        h.write_u32(shader_label.len() as u32);
        h.write_bytes(shader_label.as_bytes());
        h.write_bool(state.blend);
        h.write_u8(match state.blend_mode {
            BlendMode::Normal => 0,
            BlendMode::Add => 1,
        });
        h.write_bool(legacy);
        h.write_u8(samples);
        ProgramKey(h.finish())
    }
}

struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    fn new(seed: u64) -> Self {
        Self {
            inner: Xxh3::with_seed(seed),
        }
    }

    fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn finish(self) -> u64 {
        self.inner.digest()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/program.rs"]
mod tests;
