//! Region algebra: rectangle sets with union / intersect / subtract /
//! translate / fetch-rects, as required by spec §4.1.
//!
//! Backed by a local `Vec<Rect>` rather than the server-side XFixes region
//! object — the teacher's `DamageTracker` (gfx/src/damage.rs) showed the
//! same idea at a fixed small size; this generalizes it to full set algebra
//! (union/intersect/subtract) since the paint planner needs proper
//! rectangle-subtract for `reg_ignore`, not just bounding-box merge.

use std::cmp::{max, min};

/// An axis-aligned rectangle in device pixels. `x1`/`y1` are exclusive,
/// matching X11 geometry semantics (unlike `DamageRect` in the teacher,
/// which used inclusive corners).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rect {
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn from_xywh(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            x0: x,
            y0: y,
            x1: x + w,
            y1: y + h,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    #[inline]
    pub fn width(&self) -> i32 {
        (self.x1 - self.x0).max(0)
    }

    #[inline]
    pub fn height(&self) -> i32 {
        (self.y1 - self.y0).max(0)
    }

    #[inline]
    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            (self.x1 - self.x0) as i64 * (self.y1 - self.y0) as i64
        }
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let r = Rect {
            x0: max(self.x0, other.x0),
            y0: max(self.y0, other.y0),
            x1: min(self.x1, other.x1),
            y1: min(self.y1, other.y1),
        };
        if r.is_empty() { None } else { Some(r) }
    }

    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect {
            x0: min(self.x0, other.x0),
            y0: min(self.y0, other.y0),
            x1: max(self.x1, other.x1),
            y1: max(self.y1, other.y1),
        }
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Rect {
        Rect {
            x0: self.x0 + dx,
            y0: self.y0 + dy,
            x1: self.x1 + dx,
            y1: self.y1 + dy,
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).is_some()
    }

    /// Split `self - other` into up to 4 non-overlapping rectangles.
    fn subtract_one(&self, other: &Rect) -> Vec<Rect> {
        let Some(ov) = self.intersection(other) else {
            return vec![*self];
        };
        let mut out = Vec::with_capacity(4);
        // Top strip
        if ov.y0 > self.y0 {
            out.push(Rect::new(self.x0, self.y0, self.x1, ov.y0));
        }
        // Bottom strip
        if ov.y1 < self.y1 {
            out.push(Rect::new(self.x0, ov.y1, self.x1, self.y1));
        }
        // Left strip (within the band covered by ov vertically)
        if ov.x0 > self.x0 {
            out.push(Rect::new(self.x0, ov.y0, ov.x0, ov.y1));
        }
        // Right strip
        if ov.x1 < self.x1 {
            out.push(Rect::new(ov.x1, ov.y0, self.x1, ov.y1));
        }
        out.retain(|r| !r.is_empty());
        out
    }
}

/// A set of rectangles, maintained in a simplified (not necessarily minimal)
/// non-overlapping form. Mutators accept empty regions and yield empty
/// outputs; `dst` and `src` never alias because every operation here takes
/// `&self`/`&Region` and returns a new `Region`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    pub fn empty() -> Self {
        Self { rects: Vec::new() }
    }

    pub fn create(rects: &[Rect]) -> Self {
        let mut r = Self {
            rects: rects.iter().copied().filter(|r| !r.is_empty()).collect(),
        };
        r.simplify();
        r
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self::create(&[rect])
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn fetch_rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn extents(&self) -> Rect {
        self.rects
            .iter()
            .fold(Rect::default(), |acc, r| acc.union(r))
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }

    pub fn union_into(&self, other: &Region) -> Region {
        let mut rects = self.rects.clone();
        rects.extend_from_slice(&other.rects);
        let mut out = Region { rects };
        out.simplify();
        out
    }

    pub fn union_rect(&self, rect: Rect) -> Region {
        if rect.is_empty() {
            return self.clone();
        }
        self.union_into(&Region::from_rect(rect))
    }

    pub fn intersect_into(&self, other: &Region) -> Region {
        let mut rects = Vec::new();
        for a in &self.rects {
            for b in &other.rects {
                if let Some(r) = a.intersection(b) {
                    rects.push(r);
                }
            }
        }
        let mut out = Region { rects };
        out.simplify();
        out
    }

    /// `self - other`, applying each subtrahend rectangle in turn.
    pub fn subtract_into(&self, other: &Region) -> Region {
        let mut rects = self.rects.clone();
        for sub in &other.rects {
            rects = rects.iter().flat_map(|r| r.subtract_one(sub)).collect();
        }
        let mut out = Region { rects };
        out.simplify();
        out
    }

    pub fn subtract_rect(&self, rect: Rect) -> Region {
        if rect.is_empty() {
            return self.clone();
        }
        self.subtract_into(&Region::from_rect(rect))
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Region {
        Region {
            rects: self.rects.iter().map(|r| r.translated(dx, dy)).collect(),
        }
    }

    pub fn intersects_rect(&self, rect: &Rect) -> bool {
        self.rects.iter().any(|r| r.intersects(rect))
    }

    /// Merge rectangles that are equal or whose union covers no more area
    /// than the sum of the two (i.e. they're adjacent/overlapping on one
    /// axis), bounding how large the rect list grows across many frames.
    fn simplify(&mut self) {
        self.rects.retain(|r| !r.is_empty());
        let mut changed = true;
        while changed {
            changed = false;
            'outer: for i in 0..self.rects.len() {
                for j in (i + 1)..self.rects.len() {
                    let a = self.rects[i];
                    let b = self.rects[j];
                    if mergeable(a, b) {
                        self.rects[i] = a.union(&b);
                        self.rects.remove(j);
                        changed = true;
                        break 'outer;
                    }
                }
            }
        }
    }
}

/// Two rects can be merged losslessly into their bounding box if they share
/// a full edge (same row-band or same column-band) or one contains the
/// other.
fn mergeable(a: Rect, b: Rect) -> bool {
    if a.intersection(&b) == Some(b) || a.intersection(&b) == Some(a) {
        return true;
    }
    let same_rows = a.y0 == b.y0 && a.y1 == b.y1;
    let same_cols = a.x0 == b.x0 && a.x1 == b.x1;
    (same_rows && (a.x1 == b.x0 || b.x1 == a.x0))
        || (same_cols && (a.y1 == b.y0 || b.y1 == a.y0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_of_empty_is_empty() {
        let a = Region::empty();
        let b = Region::empty();
        assert!(a.union_into(&b).is_empty());
    }

    #[test]
    fn subtract_whole_rect_yields_empty() {
        let a = Region::from_rect(Rect::new(0, 0, 10, 10));
        let b = Region::from_rect(Rect::new(0, 0, 10, 10));
        assert!(a.subtract_into(&b).is_empty());
    }

    #[test]
    fn subtract_center_leaves_ring() {
        let a = Region::from_rect(Rect::new(0, 0, 10, 10));
        let b = Region::from_rect(Rect::new(2, 2, 8, 8));
        let diff = a.subtract_into(&b);
        assert!(!diff.is_empty());
        // area must equal 100 - 36 = 64
        let total: i64 = diff.fetch_rects().iter().map(|r| r.area()).sum();
        assert_eq!(total, 64);
        assert!(!diff.intersects_rect(&Rect::new(3, 3, 7, 7)));
    }

    #[test]
    fn intersect_disjoint_is_empty() {
        let a = Region::from_rect(Rect::new(0, 0, 10, 10));
        let b = Region::from_rect(Rect::new(20, 20, 30, 30));
        assert!(a.intersect_into(&b).is_empty());
    }

    #[test]
    fn translate_moves_all_rects() {
        let a = Region::from_rect(Rect::new(0, 0, 10, 10));
        let t = a.translate(5, -3);
        assert_eq!(t.extents(), Rect::new(5, -3, 15, 7));
    }

    #[test]
    fn no_alias_dst_src() {
        let a = Region::from_rect(Rect::new(0, 0, 10, 10));
        let b = a.union_rect(Rect::new(5, 5, 15, 15));
        // `a` must be unaffected since these are pure functions.
        assert_eq!(a.extents(), Rect::new(0, 0, 10, 10));
        assert_eq!(b.extents(), Rect::new(0, 0, 15, 15));
    }
}
