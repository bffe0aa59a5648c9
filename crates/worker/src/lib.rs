//! Poll-and-enrich worker.
//!
//! Each poll cycle fetches a project's newest tickets, pulls the first
//! dotted-quad out of every title, looks the address up with the
//! reputation provider and posts the result back as a ticket comment.
//! Cycles are stateless and failures never leave the cycle that hit them.

pub mod scanner;
pub mod scheduler;
pub mod shutdown;

pub use scanner::{extract_ipv4, CycleReport, TicketOutcome, TicketScanner};
pub use scheduler::{PollSchedule, PollScheduler, ScheduleError};
pub use shutdown::shutdown_signal;
