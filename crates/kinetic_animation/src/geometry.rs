//! Concrete animatable property types
//!
//! Small value types (points, sizes, rectangles, colors, affine
//! transforms) with their [`Animatable`] decompositions. These cover the
//! property shapes a GUI layer typically animates; consuming code can add
//! its own types by implementing [`Animatable`] the same way.

use crate::values::{AnimVector, Animatable};

/// 2D point
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Animatable for Point {
    const COMPONENTS: usize = 2;

    fn to_vector(&self) -> AnimVector {
        AnimVector::from_slice(&[self.x, self.y])
    }

    fn from_vector(v: &AnimVector) -> Self {
        debug_assert_eq!(v.len(), 2, "vector length mismatch for Point");
        Self::new(v[0], v[1])
    }

    fn zero() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// 2D extent
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Animatable for Size {
    const COMPONENTS: usize = 2;

    fn to_vector(&self) -> AnimVector {
        AnimVector::from_slice(&[self.width, self.height])
    }

    fn from_vector(v: &AnimVector) -> Self {
        debug_assert_eq!(v.len(), 2, "vector length mismatch for Size");
        Self::new(v[0], v[1])
    }

    fn zero() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Axis-aligned rectangle (origin + size)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }
}

impl Animatable for Rect {
    const COMPONENTS: usize = 4;

    fn to_vector(&self) -> AnimVector {
        AnimVector::from_slice(&[
            self.origin.x,
            self.origin.y,
            self.size.width,
            self.size.height,
        ])
    }

    fn from_vector(v: &AnimVector) -> Self {
        debug_assert_eq!(v.len(), 4, "vector length mismatch for Rect");
        Self::new(v[0], v[1], v[2], v[3])
    }

    fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

/// RGBA color (linear space)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

impl Animatable for Color {
    const COMPONENTS: usize = 4;

    fn to_vector(&self) -> AnimVector {
        AnimVector::from_slice(&[self.r, self.g, self.b, self.a])
    }

    fn from_vector(v: &AnimVector) -> Self {
        debug_assert_eq!(v.len(), 4, "vector length mismatch for Color");
        Self::rgba(v[0], v[1], v[2], v[3])
    }

    // Fully transparent: the deterministic representation of "no color",
    // so an absent color animates like any other value.
    fn zero() -> Self {
        Self::TRANSPARENT
    }
}

/// Optional colors animate to/from [`Color::TRANSPARENT`].
impl Animatable for Option<Color> {
    const COMPONENTS: usize = 4;

    fn to_vector(&self) -> AnimVector {
        self.unwrap_or(Color::TRANSPARENT).to_vector()
    }

    fn from_vector(v: &AnimVector) -> Self {
        Some(Color::from_vector(v))
    }

    fn zero() -> Self {
        None
    }
}

/// 2D affine transform
///
/// Column-major `[a b; c d]` linear part plus `(tx, ty)` translation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            tx,
            ty,
            ..Self::IDENTITY
        }
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Animatable for Transform {
    const COMPONENTS: usize = 6;

    fn to_vector(&self) -> AnimVector {
        AnimVector::from_slice(&[self.a, self.b, self.c, self.d, self.tx, self.ty])
    }

    fn from_vector(v: &AnimVector) -> Self {
        debug_assert_eq!(v.len(), 6, "vector length mismatch for Transform");
        Self {
            a: v[0],
            b: v[1],
            c: v[2],
            d: v[3],
            tx: v[4],
            ty: v[5],
        }
    }

    fn zero() -> Self {
        Self {
            a: 0.0,
            b: 0.0,
            c: 0.0,
            d: 0.0,
            tx: 0.0,
            ty: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips() {
        let p = Point::new(12.5, -3.0);
        assert_eq!(Point::from_vector(&p.to_vector()), p);

        let s = Size::new(100.0, 50.0);
        assert_eq!(Size::from_vector(&s.to_vector()), s);

        let r = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(Rect::from_vector(&r.to_vector()), r);

        let c = Color::rgba(0.1, 0.2, 0.3, 0.4);
        assert_eq!(Color::from_vector(&c.to_vector()), c);

        let t = Transform::translation(5.0, -5.0);
        assert_eq!(Transform::from_vector(&t.to_vector()), t);
    }

    #[test]
    fn test_component_counts_are_stable() {
        assert_eq!(Point::zero().to_vector().len(), Point::COMPONENTS);
        assert_eq!(Rect::zero().to_vector().len(), Rect::COMPONENTS);
        assert_eq!(Color::zero().to_vector().len(), Color::COMPONENTS);
        assert_eq!(Transform::zero().to_vector().len(), Transform::COMPONENTS);
    }

    #[test]
    fn test_absent_color_is_transparent() {
        let none: Option<Color> = None;
        assert_eq!(none.to_vector(), Color::TRANSPARENT.to_vector());
        // Reconstructed absence comes back as an explicit transparent color
        let back = <Option<Color>>::from_vector(&none.to_vector());
        assert_eq!(back, Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_composite_rect_color_pair() {
        let pair = (Rect::new(0.0, 0.0, 10.0, 10.0), Color::WHITE);
        let v = pair.to_vector();
        assert_eq!(v.len(), 8);
        assert_eq!(<(Rect, Color)>::from_vector(&v), pair);
    }
}
