use crate::common::*;

/// The generic rectangle.
pub trait Rect {
    type Type;

    fn t(&self) -> Self::Type;
    fn l(&self) -> Self::Type;
    fn b(&self) -> Self::Type;
    fn r(&self) -> Self::Type;
    fn h(&self) -> Self::Type;
    fn w(&self) -> Self::Type;

    fn try_from_tlbr(tlbr: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;

    fn try_from_tlhw(tlhw: [Self::Type; 4]) -> Result<Self>
    where
        Self: Sized;
}

pub trait RectNum: Rect
where
    Self::Type: Num + PartialOrd,
{
    fn tlbr(&self) -> [Self::Type; 4] {
        [self.t(), self.l(), self.b(), self.r()]
    }

    /// Check if every side lies in the closed range [0, 1].
    fn is_unit_bounded(&self) -> bool {
        let zero = <Self::Type as Zero>::zero();
        let one = <Self::Type as One>::one();
        self.tlbr()
            .into_iter()
            .all(|value| value >= zero && value <= one)
    }
}

impl<T> RectNum for T
where
    T: Rect,
    T::Type: Num + PartialOrd,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TLBR;

    #[test]
    fn unit_bounded_check() {
        let inside = TLBR::try_from_tlbr([0.0, 0.25, 1.0, 0.75]).unwrap();
        assert!(inside.is_unit_bounded());

        let outside = TLBR::try_from_tlbr([0.5f32, 0.5, 1.25, 0.75]).unwrap();
        assert!(!outside.is_unit_bounded());

        let negative = TLBR::try_from_tlbr([-0.1, 0.0, 0.5, 0.5]).unwrap();
        assert!(!negative.is_unit_bounded());
    }
}
