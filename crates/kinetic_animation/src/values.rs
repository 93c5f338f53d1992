//! Animatable value types
//!
//! Provides the vector abstraction that lets arbitrary property types be
//! animated uniformly: every animatable value decomposes into a flat list
//! of `f64` components, the motion models operate on those components, and
//! the typed value is reconstructed when it is handed back to the caller.

use smallvec::SmallVec;

/// A property value decomposed into flat `f64` components.
///
/// All motion-model arithmetic is componentwise over this representation.
/// The component count is stable per property type for the lifetime of an
/// animation; mixing vectors of different lengths in one operation is a
/// programming error and is fatal in debug builds. Release builds operate
/// over the shorter length rather than panicking.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimVector {
    components: SmallVec<[f64; 8]>,
}

impl AnimVector {
    /// Create a vector from a slice of components
    pub fn from_slice(components: &[f64]) -> Self {
        Self {
            components: SmallVec::from_slice(components),
        }
    }

    /// A zero vector with the given component count
    pub fn zeros(len: usize) -> Self {
        Self {
            components: smallvec::smallvec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.components
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.components
    }

    /// Componentwise sum
    pub fn add(&self, other: &AnimVector) -> AnimVector {
        debug_assert_eq!(self.len(), other.len(), "vector length mismatch in add");
        let n = self.len().min(other.len());
        let mut out = self.clone();
        for i in 0..n {
            out.components[i] += other.components[i];
        }
        out
    }

    /// Componentwise difference `self - other`
    pub fn sub(&self, other: &AnimVector) -> AnimVector {
        debug_assert_eq!(self.len(), other.len(), "vector length mismatch in sub");
        let n = self.len().min(other.len());
        let mut out = self.clone();
        for i in 0..n {
            out.components[i] -= other.components[i];
        }
        out
    }

    /// Scale every component by `factor`
    pub fn scale(&self, factor: f64) -> AnimVector {
        let mut out = self.clone();
        for c in out.components.iter_mut() {
            *c *= factor;
        }
        out
    }

    /// Interpolated value `self + (other - self) * t`
    ///
    /// `t` is not clamped; the easing model guarantees its own bounds.
    pub fn lerp(&self, other: &AnimVector, t: f64) -> AnimVector {
        debug_assert_eq!(self.len(), other.len(), "vector length mismatch in lerp");
        let n = self.len().min(other.len());
        let mut out = self.clone();
        for i in 0..n {
            out.components[i] += (other.components[i] - out.components[i]) * t;
        }
        out
    }

    /// Squared Euclidean magnitude (used for convergence tests)
    pub fn magnitude_squared(&self) -> f64 {
        self.components.iter().map(|c| c * c).sum()
    }

    /// Largest absolute component
    pub fn max_abs_component(&self) -> f64 {
        self.components.iter().fold(0.0, |m, c| m.max(c.abs()))
    }

    /// Round every component to the nearest multiple of `1.0 / scale`.
    ///
    /// Used for pixel snapping of *emitted* values; the stored trajectory
    /// stays continuous.
    pub fn round_to_scale(&self, scale: f64) -> AnimVector {
        let mut out = self.clone();
        if scale > 0.0 {
            for c in out.components.iter_mut() {
                *c = (*c * scale).round() / scale;
            }
        }
        out
    }

    pub fn is_finite(&self) -> bool {
        self.components.iter().all(|c| c.is_finite())
    }

    /// Reject NaN/infinite components injected from outside the engine.
    ///
    /// A non-finite component would poison the trajectory and defeat all
    /// convergence checks, so the setters fail loudly instead.
    pub fn assert_finite(&self, context: &str) {
        assert!(
            self.is_finite(),
            "non-finite component in {context}: {:?}",
            self.components
        );
    }
}

impl std::ops::Index<usize> for AnimVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.components[index]
    }
}

impl std::ops::IndexMut<usize> for AnimVector {
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.components[index]
    }
}

/// Trait for values that can be animated.
///
/// The mapping to [`AnimVector`] must be a bijection on the valid domain
/// and must round-trip exactly for values produced by the engine itself:
/// `T::from_vector(&t.to_vector()) == t`.
pub trait Animatable: Clone + PartialEq + 'static {
    /// Number of components this type decomposes into (stable per type)
    const COMPONENTS: usize;

    /// Decompose into flat components
    fn to_vector(&self) -> AnimVector;

    /// Reconstruct from flat components
    ///
    /// Panics in debug builds if `v.len() != Self::COMPONENTS`.
    fn from_vector(v: &AnimVector) -> Self;

    /// The additive identity of this type
    fn zero() -> Self;
}

// ============================================================================
// Scalar Implementations
// ============================================================================

impl Animatable for f64 {
    const COMPONENTS: usize = 1;

    fn to_vector(&self) -> AnimVector {
        AnimVector::from_slice(&[*self])
    }

    fn from_vector(v: &AnimVector) -> Self {
        debug_assert_eq!(v.len(), 1, "vector length mismatch for f64");
        v[0]
    }

    fn zero() -> Self {
        0.0
    }
}

impl Animatable for f32 {
    const COMPONENTS: usize = 1;

    fn to_vector(&self) -> AnimVector {
        AnimVector::from_slice(&[*self as f64])
    }

    fn from_vector(v: &AnimVector) -> Self {
        debug_assert_eq!(v.len(), 1, "vector length mismatch for f32");
        v[0] as f32
    }

    fn zero() -> Self {
        0.0
    }
}

// ============================================================================
// Composite Implementation (pairs of animatables)
// ============================================================================

impl<A: Animatable, B: Animatable> Animatable for (A, B) {
    const COMPONENTS: usize = A::COMPONENTS + B::COMPONENTS;

    fn to_vector(&self) -> AnimVector {
        let mut v = self.0.to_vector();
        let b = self.1.to_vector();
        v.components.extend_from_slice(b.as_slice());
        v
    }

    fn from_vector(v: &AnimVector) -> Self {
        debug_assert_eq!(v.len(), Self::COMPONENTS, "vector length mismatch for pair");
        let (a, b) = v.as_slice().split_at(A::COMPONENTS);
        (
            A::from_vector(&AnimVector::from_slice(a)),
            B::from_vector(&AnimVector::from_slice(b)),
        )
    }

    fn zero() -> Self {
        (A::zero(), B::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_componentwise_arithmetic() {
        let a = AnimVector::from_slice(&[1.0, 2.0, 3.0]);
        let b = AnimVector::from_slice(&[10.0, 20.0, 30.0]);

        assert_eq!(a.add(&b).as_slice(), &[11.0, 22.0, 33.0]);
        assert_eq!(b.sub(&a).as_slice(), &[9.0, 18.0, 27.0]);
        assert_eq!(a.scale(2.0).as_slice(), &[2.0, 4.0, 6.0]);
        assert_eq!(a.lerp(&b, 0.5).as_slice(), &[5.5, 11.0, 16.5]);
    }

    #[test]
    fn test_magnitude() {
        let v = AnimVector::from_slice(&[3.0, 4.0]);
        assert!((v.magnitude_squared() - 25.0).abs() < 1e-12);
        assert_eq!(v.max_abs_component(), 4.0);
    }

    #[test]
    fn test_round_to_scale() {
        let v = AnimVector::from_slice(&[10.26, -3.74]);
        // 2x display scale snaps to half-pixel boundaries
        let snapped = v.round_to_scale(2.0);
        assert_eq!(snapped.as_slice(), &[10.5, -3.5]);
        // Snapping never mutates the original
        assert_eq!(v.as_slice(), &[10.26, -3.74]);
    }

    #[test]
    fn test_scalar_round_trip() {
        let x = 42.5_f64;
        assert_eq!(f64::from_vector(&x.to_vector()), x);
        assert_eq!(f64::zero(), 0.0);
    }

    #[test]
    fn test_pair_round_trip() {
        let p = (1.5_f64, 2.5_f64);
        let v = p.to_vector();
        assert_eq!(v.len(), 2);
        assert_eq!(<(f64, f64)>::from_vector(&v), p);
    }

    #[test]
    #[should_panic]
    fn test_non_finite_rejected() {
        AnimVector::from_slice(&[f64::NAN]).assert_finite("test");
    }
}
