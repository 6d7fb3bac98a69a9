use std::fmt;
use std::str::FromStr;

use super::SurfaceError;

/// Axis-aligned box in surface-local coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    pub fn union(&self, other: &BBox) -> Self {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = self.right().max(other.right());
        let max_y = self.bottom().max(other.bottom());
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn contains(&self, point: (f32, f32)) -> bool {
        point.0 >= self.x
            && point.0 <= self.right()
            && point.1 >= self.y
            && point.1 <= self.bottom()
    }
}

/// 2D translation of a container, encoded as `translate( <x> <y> )`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Translate {
    pub x: f32,
    pub y: f32,
}

impl Translate {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Translate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "translate( {} {} )", self.x, self.y)
    }
}

impl FromStr for Translate {
    type Err = SurfaceError;

    /// Accepts `translate( x y )`, `translate(x,y)` and `translate(x)`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || SurfaceError::InvalidTransform(raw.to_string());
        let inner = raw
            .trim()
            .strip_prefix("translate")
            .map(str::trim_start)
            .and_then(|rest| rest.strip_prefix('('))
            .and_then(|rest| rest.trim_end().strip_suffix(')'))
            .ok_or_else(invalid)?;
        let mut values = inner
            .split(|ch: char| ch == ',' || ch.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<f32>().map_err(|_| invalid()));
        let x = values.next().ok_or_else(invalid)??;
        let y = values.next().transpose()?.unwrap_or(0.0);
        if values.next().is_some() {
            return Err(invalid());
        }
        Ok(Self::new(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_formats_with_spaced_parens() {
        assert_eq!(Translate::new(10.0, -4.5).to_string(), "translate( 10 -4.5 )");
    }

    #[test]
    fn translate_parses_common_spellings() {
        assert_eq!("translate( 3 4 )".parse::<Translate>(), Ok(Translate::new(3.0, 4.0)));
        assert_eq!("translate(3,4)".parse::<Translate>(), Ok(Translate::new(3.0, 4.0)));
        assert_eq!("translate(7)".parse::<Translate>(), Ok(Translate::new(7.0, 0.0)));
    }

    #[test]
    fn translate_rejects_garbage() {
        assert!("scale(2)".parse::<Translate>().is_err());
        assert!("translate(a b)".parse::<Translate>().is_err());
        assert!("translate(1 2 3)".parse::<Translate>().is_err());
    }

    #[test]
    fn bbox_union_covers_both() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(20.0, -5.0, 5.0, 5.0);
        assert_eq!(a.union(&b), BBox::new(0.0, -5.0, 25.0, 15.0));
        assert_eq!(a.center(), (5.0, 5.0));
    }
}
