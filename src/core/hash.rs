use image::{DynamicImage, ImageReader};
use image_hasher::{HashAlg, Hasher, HasherConfig, ImageHash};
use std::path::Path;
use thiserror::Error;

/// Side length of every hash grid; each hash is `HASH_SIZE * HASH_SIZE` bits.
pub const HASH_SIZE: u32 = 8;

/// Bit width shared by all three hash families.
pub const HASH_BITS: u32 = HASH_SIZE * HASH_SIZE;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Hashing panicked: {0}")]
    Panicked(String),
}

/// The three perceptual hashes computed for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintTriple {
    /// DCT low-frequency hash (pHash).
    pub coarse_hash: ImageHash,
    /// Adjacent-pixel difference hash (dHash).
    pub gradient_hash: ImageHash,
    /// Block mean hash (aHash).
    pub average_hash: ImageHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashDistances {
    pub coarse: u32,
    pub gradient: u32,
    pub average: u32,
}

impl FingerprintTriple {
    pub fn distances(&self, other: &Self) -> HashDistances {
        HashDistances {
            coarse: self.coarse_hash.dist(&other.coarse_hash),
            gradient: self.gradient_hash.dist(&other.gradient_hash),
            average: self.average_hash.dist(&other.average_hash),
        }
    }
}

/// Computes fingerprint triples. Holds one configured hasher per family so
/// every image in a run is hashed with identical settings.
pub struct PerceptualHasher {
    coarse: Hasher,
    gradient: Hasher,
    average: Hasher,
}

impl PerceptualHasher {
    pub fn new() -> Self {
        Self {
            coarse: HasherConfig::new()
                .hash_size(HASH_SIZE, HASH_SIZE)
                .hash_alg(HashAlg::Mean)
                .preproc_dct()
                .to_hasher(),
            gradient: HasherConfig::new()
                .hash_size(HASH_SIZE, HASH_SIZE)
                .hash_alg(HashAlg::Gradient)
                .to_hasher(),
            average: HasherConfig::new()
                .hash_size(HASH_SIZE, HASH_SIZE)
                .hash_alg(HashAlg::Mean)
                .to_hasher(),
        }
    }

    /// Decode the file at `path`, sniffing the format from its content.
    pub fn decode_image(path: &Path) -> Result<DynamicImage, HashError> {
        let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        Ok(image)
    }

    pub fn fingerprint_image(&self, image: &DynamicImage) -> FingerprintTriple {
        FingerprintTriple {
            coarse_hash: self.coarse.hash_image(image),
            gradient_hash: self.gradient.hash_image(image),
            average_hash: self.average.hash_image(image),
        }
    }

    pub fn fingerprint_file(&self, path: &Path) -> Result<FingerprintTriple, HashError> {
        let image = Self::decode_image(path)?;
        Ok(self.fingerprint_image(&image))
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod test_images {
    use image::{ImageBuffer, Rgb, RgbImage};
    use std::path::Path;

    /// Deterministic pseudo-random RGB noise; different seeds give unrelated images.
    pub fn noise_image(width: u32, height: u32, seed: u64) -> RgbImage {
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ImageBuffer::from_fn(width, height, |_, _| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let v = (state >> 56) as u8;
            Rgb([v, v.wrapping_add(17), v.wrapping_add(101)])
        })
    }

    pub fn gradient_image(width: u32, height: u32) -> RgbImage {
        ImageBuffer::from_fn(width, height, |x, _| {
            let intensity = (x * 255 / width.max(1)) as u8;
            Rgb([intensity, intensity, intensity])
        })
    }

    pub fn save_noise(path: &Path, seed: u64) {
        noise_image(64, 64, seed).save(path).unwrap();
    }
}
