mod clock;
mod scheduler;

pub use clock::{Clock, SystemClock, TokioClock};
pub use scheduler::{CountdownInfo, EscalationScheduler, Expiry};
