use serde::{Deserialize, Serialize};

/// Face embedding vector. Dimensionality is fixed by the extractor model
/// that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Compute Euclidean distance to another embedding. Lower = more similar.
    pub fn distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// Rectangle locating a detected face within a raster image, in pixel
/// coordinates. Used transiently during liveness analysis and embedding
/// extraction; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl FaceRegion {
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Clamp the region to an image of the given dimensions.
    pub fn clamp_to(&self, image_width: u32, image_height: u32) -> FaceRegion {
        FaceRegion {
            top: self.top.min(image_height),
            right: self.right.min(image_width),
            bottom: self.bottom.min(image_height),
            left: self.left.min(image_width),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_identical() {
        let a = Embedding::new(vec![0.3, -0.5, 0.8]);
        assert!(a.distance(&a).abs() < 1e-6);
    }

    #[test]
    fn test_distance_known_value() {
        // 3-4-5 triangle
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![3.0, 4.0]);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = Embedding::new(vec![1.0, 2.0, 3.0]);
        let b = Embedding::new(vec![-1.0, 0.5, 2.0]);
        assert!((a.distance(&b) - b.distance(&a)).abs() < 1e-6);
    }

    #[test]
    fn test_region_dimensions() {
        let r = FaceRegion { top: 10, right: 110, bottom: 90, left: 30 };
        assert_eq!(r.width(), 80);
        assert_eq!(r.height(), 80);
    }

    #[test]
    fn test_region_clamp() {
        let r = FaceRegion { top: 10, right: 500, bottom: 400, left: 30 };
        let clamped = r.clamp_to(320, 240);
        assert_eq!(clamped.right, 320);
        assert_eq!(clamped.bottom, 240);
        assert_eq!(clamped.left, 30);
        assert_eq!(clamped.top, 10);
    }

    #[test]
    fn test_region_degenerate_width() {
        let r = FaceRegion { top: 0, right: 10, bottom: 10, left: 20 };
        assert_eq!(r.width(), 0);
    }
}
