use bbox::{Rect, TLBR};
use num_traits::{NumCast, ToPrimitive};

/// A rectangle annotated with a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label<R, C>
where
    R: Rect,
{
    pub rect: R,
    pub class: C,
}

impl<T, C> Label<TLBR<T>, C>
where
    TLBR<T>: Rect,
{
    /// Cast the coordinates to another numeric type, keeping the class.
    pub fn try_cast<V>(self) -> Option<Label<TLBR<V>, C>>
    where
        T: ToPrimitive,
        V: NumCast,
        TLBR<V>: Rect,
    {
        let Self { rect, class } = self;
        Some(Label {
            rect: rect.try_cast()?,
            class,
        })
    }
}
