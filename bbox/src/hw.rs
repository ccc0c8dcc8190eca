use crate::{common::*, Rect, TLBR};

/// The height and width of an image or a box.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HW<T> {
    h: T,
    w: T,
}

impl<T> HW<T>
where
    T: Num + PartialOrd + Copy,
{
    pub fn try_from_hw(hw: [T; 2]) -> Result<Self> {
        let [h, w] = hw;
        let zero = T::zero();
        ensure!(
            h >= zero && w >= zero,
            "height and width parameters must be non-negative"
        );
        Ok(Self { h, w })
    }

    /// Check if either side is zero.
    pub fn is_empty(&self) -> bool {
        self.h == T::zero() || self.w == T::zero()
    }

    /// Convert a [t, l, h, w] box in units of this size into a box relative
    /// to this size.
    ///
    /// The top-left corner and the extent are divided separately, and the
    /// bottom-right corner is the sum of both.
    pub fn try_normalize_tlhw(&self, tlhw: [T; 4]) -> Result<TLBR<T>> {
        ensure!(!self.is_empty(), "cannot normalize against an empty size");
        let [t, l, h, w] = tlhw;
        TLBR::try_from_tlhw([t / self.h, l / self.w, h / self.h, w / self.w])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RectNum;
    use approx::assert_abs_diff_eq;

    #[test]
    fn normalize_tlhw() {
        let size = HW::try_from_hw([480.0, 640.0]).unwrap();
        let rect = size.try_normalize_tlhw([48.0, 64.0, 96.0, 128.0]).unwrap();
        let [t, l, b, r] = rect.tlbr();
        assert_abs_diff_eq!(t, 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(l, 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(b, 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(r, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn normalize_against_empty_size_fails() {
        let size = HW::try_from_hw([480.0, 0.0]).unwrap();
        assert!(size.is_empty());
        assert!(size.try_normalize_tlhw([0.0, 0.0, 1.0, 1.0]).is_err());
    }

    #[test]
    fn negative_size_is_rejected() {
        assert!(HW::try_from_hw([-1.0, 2.0]).is_err());
    }
}
