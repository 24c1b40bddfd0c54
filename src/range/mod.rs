pub mod period;
pub mod resolver;

pub use period::PeriodSelection;
pub use resolver::{resolve, resolve_at, DateRange, RangeBound, RangeParseWarning, ResolvedRange};
