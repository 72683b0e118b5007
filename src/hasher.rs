//! The digest capability every benchmarked algorithm is driven through.
//!
//! Each backend crate exposes its own incremental API, so each family gets a
//! small adapter implementing [`DynDigest`].

use anyhow::{bail, Context, Result};
use blake2::digest::VariableOutput;
use blake2::Blake2bVar;
use digest::{Digest, Update};

/// Incremental digest: write, sum, reset.
pub trait DynDigest: Send {
    /// Feeds more input into the running state.
    fn update(&mut self, data: &[u8]);
    /// Digest of everything written since the last reset. Leaves the state untouched.
    fn finalize(&mut self) -> Vec<u8>;
    /// Returns the state to what a freshly constructed instance holds.
    fn reset(&mut self);
    fn output_size(&self) -> usize;
}

/// Any RustCrypto fixed-output hash (`sha2`, `sha-1`, `md-5`, `blake2`, `skein`).
pub struct RustCrypto<D>(D);

impl<D: Digest + Clone + Send> RustCrypto<D> {
    pub fn new() -> Self {
        Self(<D as Digest>::new())
    }
}

impl<D: Digest + Clone + Send> Default for RustCrypto<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Digest + Clone + Send> DynDigest for RustCrypto<D> {
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    fn finalize(&mut self) -> Vec<u8> {
        Digest::finalize(self.0.clone()).to_vec()
    }

    fn reset(&mut self) {
        self.0 = <D as Digest>::new();
    }

    fn output_size(&self) -> usize {
        <D as Digest>::output_size()
    }
}

/// BLAKE2b with an output length chosen at runtime.
pub struct Blake2bVarWrapper {
    initial: Blake2bVar,
    state: Blake2bVar,
}

impl Blake2bVarWrapper {
    pub fn new(output_size: usize) -> Result<Self> {
        let initial = Blake2bVar::new(output_size)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("BLAKE2b does not support a {}-byte output", output_size))?;
        Ok(Self {
            state: initial.clone(),
            initial,
        })
    }
}

impl DynDigest for Blake2bVarWrapper {
    fn update(&mut self, data: &[u8]) {
        Update::update(&mut self.state, data);
    }

    fn finalize(&mut self) -> Vec<u8> {
        self.state.clone().finalize_boxed().into_vec()
    }

    fn reset(&mut self) {
        self.state = self.initial.clone();
    }

    fn output_size(&self) -> usize {
        VariableOutput::output_size(&self.initial)
    }
}

pub struct Blake2bSimd {
    params: blake2b_simd::Params,
    state: blake2b_simd::State,
    output_size: usize,
}

impl Blake2bSimd {
    pub fn new(output_size: usize) -> Result<Self> {
        if output_size == 0 || output_size > blake2b_simd::OUTBYTES {
            bail!("blake2b_simd does not support a {}-byte output", output_size);
        }
        let mut params = blake2b_simd::Params::new();
        params.hash_length(output_size);
        Ok(Self {
            state: params.to_state(),
            params,
            output_size,
        })
    }
}

impl DynDigest for Blake2bSimd {
    fn update(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    fn finalize(&mut self) -> Vec<u8> {
        self.state.finalize().as_bytes().to_vec()
    }

    fn reset(&mut self) {
        self.state = self.params.to_state();
    }

    fn output_size(&self) -> usize {
        self.output_size
    }
}

pub struct Blake2sSimd {
    params: blake2s_simd::Params,
    state: blake2s_simd::State,
    output_size: usize,
}

impl Blake2sSimd {
    pub fn new(output_size: usize) -> Result<Self> {
        if output_size == 0 || output_size > blake2s_simd::OUTBYTES {
            bail!("blake2s_simd does not support a {}-byte output", output_size);
        }
        let mut params = blake2s_simd::Params::new();
        params.hash_length(output_size);
        Ok(Self {
            state: params.to_state(),
            params,
            output_size,
        })
    }
}

impl DynDigest for Blake2sSimd {
    fn update(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    fn finalize(&mut self) -> Vec<u8> {
        self.state.finalize().as_bytes().to_vec()
    }

    fn reset(&mut self) {
        self.state = self.params.to_state();
    }

    fn output_size(&self) -> usize {
        self.output_size
    }
}

/// BLAKE3, optionally splitting large inputs across the rayon pool.
pub struct Blake3 {
    hasher: blake3::Hasher,
    parallel: bool,
}

impl Blake3 {
    pub fn serial() -> Self {
        Self {
            hasher: blake3::Hasher::new(),
            parallel: false,
        }
    }

    pub fn parallel() -> Self {
        Self {
            hasher: blake3::Hasher::new(),
            parallel: true,
        }
    }
}

impl DynDigest for Blake3 {
    fn update(&mut self, data: &[u8]) {
        if self.parallel {
            self.hasher.update_rayon(data);
        } else {
            self.hasher.update(data);
        }
    }

    fn finalize(&mut self) -> Vec<u8> {
        self.hasher.finalize().as_bytes().to_vec()
    }

    fn reset(&mut self) {
        self.hasher.reset();
    }

    fn output_size(&self) -> usize {
        blake3::OUT_LEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use md5::Md5;
    use sha1::Sha1;
    use sha2::Sha256;

    fn hex_of(h: &mut dyn DynDigest, data: &[u8]) -> String {
        h.update(data);
        hex::encode(h.finalize())
    }

    #[test]
    fn test_known_vectors() {
        let mut h = RustCrypto::<Md5>::new();
        assert_eq!(hex_of(&mut h, b"hello"), "5d41402abc4b2a76b9719d911017c592");

        let mut h = RustCrypto::<Sha1>::new();
        assert_eq!(
            hex_of(&mut h, b"hello"),
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
        );

        let mut h = RustCrypto::<Sha256>::new();
        assert_eq!(
            hex_of(&mut h, b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_finalize_does_not_consume_state() {
        let mut h = RustCrypto::<Sha256>::new();
        h.update(b"hel");
        let _ = h.finalize();
        h.update(b"lo");
        assert_eq!(
            hex::encode(h.finalize()),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_simd_matches_portable() -> Result<()> {
        let data = vec![0xa5u8; 4096];

        let mut portable = Blake2bVarWrapper::new(32)?;
        let mut simd = Blake2bSimd::new(32)?;
        portable.update(&data);
        simd.update(&data);
        assert_eq!(portable.finalize(), simd.finalize());

        let mut portable = RustCrypto::<blake2::Blake2s256>::new();
        let mut simd = Blake2sSimd::new(32)?;
        portable.update(&data);
        simd.update(&data);
        assert_eq!(portable.finalize(), simd.finalize());
        Ok(())
    }

    #[test]
    fn test_blake3_parallel_matches_serial() {
        let data = vec![7u8; 1 << 20];
        let mut serial = Blake3::serial();
        let mut parallel = Blake3::parallel();
        serial.update(&data);
        parallel.update(&data);
        assert_eq!(serial.finalize(), parallel.finalize());
        assert_eq!(serial.output_size(), 32);
    }

    #[test]
    fn test_invalid_output_sizes_rejected() {
        assert!(Blake2bVarWrapper::new(65).is_err());
        assert!(Blake2bSimd::new(65).is_err());
        assert!(Blake2sSimd::new(0).is_err());
        assert!(Blake2sSimd::new(33).is_err());
    }
}
