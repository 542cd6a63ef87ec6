pub mod academic;
pub mod attendance;
pub mod billing;
pub mod grading;
pub mod report_cards;
pub mod schools;

pub use academic::*;
pub use attendance::*;
pub use billing::*;
pub use grading::*;
pub use report_cards::*;
pub use schools::*;
