/// Checks that a numerical value is in the interval `[a,b]`, or `(a,b]` when the lower bound
/// is prefixed with `>`, and returns early with a helpful
/// [`Error::InvalidHyperparameter`](crate::Error::InvalidHyperparameter) if not
///
/// ### Example
/// ```ignore
/// let alpha = 0.0;
/// check_interval!(alpha, > 0.0, 1.0);
/// ```
/// This returns an error reporting that `alpha` must be in the interval (0.0, 1.0].
macro_rules! check_interval {
    ($var:expr, > $a:expr, $b:expr) => {
        if !($var > $a && $var <= $b) {
            return Err($crate::Error::InvalidHyperparameter {
                name: stringify!($var),
                value: $var,
                interval: concat!("(", stringify!($a), ", ", stringify!($b), "]"),
            });
        }
    };
    ($var:expr, $a:expr, $b:expr) => {
        if !($var >= $a && $var <= $b) {
            return Err($crate::Error::InvalidHyperparameter {
                name: stringify!($var),
                value: $var,
                interval: concat!("[", stringify!($a), ", ", stringify!($b), "]"),
            });
        }
    };
}

pub(crate) use check_interval;
