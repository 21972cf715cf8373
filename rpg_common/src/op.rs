/// Implements the standard arithmetic operator traits for a single-field
/// newtype wrapping an integer.
#[macro_export]
macro_rules! op {
    (binary $t:ty, $trait:ident, $f:ident) => {
        impl $trait for $t {
            type Output = Self;

            fn $f(self, rhs: Self) -> Self::Output {
                Self::from($trait::$f(self.value(), rhs.value()))
            }
        }
    };
    (inplace $t:ty, $trait:ident, $f:ident via $via:ident, $via_f:ident) => {
        impl $trait for $t {
            fn $f(&mut self, rhs: Self) {
                *self = Self::from($via::$via_f(self.value(), rhs.value()));
            }
        }
    };
    (unary $t:ty, $trait:ident, $f:ident) => {
        impl $trait for $t {
            type Output = Self;

            fn $f(self) -> Self::Output {
                Self::from($trait::$f(self.value()))
            }
        }
    };
}
