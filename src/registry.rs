//! Name -> digest implementation map, built once at startup.

use crate::hasher::{Blake2bSimd, Blake2bVarWrapper, Blake2sSimd, Blake3, DynDigest, RustCrypto};
use anyhow::{bail, Context, Result};
use blake2::{Blake2b, Blake2b512, Blake2s256};
use digest::consts::U32;
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use skein::{Skein1024, Skein256, Skein512};
use std::collections::BTreeMap;

/// Registered implementations, always iterated in sorted name order.
#[derive(Default)]
pub struct Registry {
    entries: BTreeMap<String, Box<dyn DynDigest>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, hasher: Box<dyn DynDigest>) -> Result<()> {
        if self.entries.contains_key(name) {
            bail!("Hash implementation {:?} registered twice", name);
        }
        self.entries.insert(name.to_string(), hasher);
        Ok(())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn DynDigest + 'static)> {
        self.entries.get_mut(name).map(|h| h.as_mut())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn DynDigest)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut (dyn DynDigest + 'static))> {
        self.entries
            .iter_mut()
            .map(|(k, v)| (k.as_str(), v.as_mut()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Every algorithm variant the tool ships with. Skein variants all produce 256-bit digests.
///
/// Fails if any variant rejects its parameters; no partial registry is returned.
pub fn default_registry() -> Result<Registry> {
    let mut registry = Registry::new();

    registry.insert("SHA256", Box::new(RustCrypto::<Sha256>::new()))?;
    registry.insert("SHA512", Box::new(RustCrypto::<Sha512>::new()))?;
    registry.insert("SHA1", Box::new(RustCrypto::<Sha1>::new()))?;
    registry.insert("MD5", Box::new(RustCrypto::<Md5>::new()))?;

    registry.insert("Blake2b 256", Box::new(RustCrypto::<Blake2b<U32>>::new()))?;
    registry.insert("Blake2b 512", Box::new(RustCrypto::<Blake2b512>::new()))?;
    registry.insert("Blake2s 256", Box::new(RustCrypto::<Blake2s256>::new()))?;
    registry.insert(
        "Blake2b 256 Var",
        Box::new(Blake2bVarWrapper::new(32).context("Blake2b 256 Var")?),
    )?;

    registry.insert(
        "Blake2b 256 SIMD",
        Box::new(Blake2bSimd::new(32).context("Blake2b 256 SIMD")?),
    )?;
    registry.insert(
        "Blake2b 512 SIMD",
        Box::new(Blake2bSimd::new(64).context("Blake2b 512 SIMD")?),
    )?;
    registry.insert(
        "Blake2s 256 SIMD",
        Box::new(Blake2sSimd::new(32).context("Blake2s 256 SIMD")?),
    )?;

    registry.insert("Skein 256", Box::new(RustCrypto::<Skein256<U32>>::new()))?;
    registry.insert("Skein 512", Box::new(RustCrypto::<Skein512<U32>>::new()))?;
    registry.insert("Skein 1024", Box::new(RustCrypto::<Skein1024<U32>>::new()))?;

    registry.insert("BLAKE3", Box::new(Blake3::serial()))?;
    registry.insert("BLAKE3 Rayon", Box::new(Blake3::parallel()))?;

    Ok(registry)
}
