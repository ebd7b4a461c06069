//! The ticket inventory core: capacity accounting, expiring holds, and
//! exactly-once conversion of holds into orders and tickets.
//!
//! The four pieces — [`Ledger`], [`ReservationManager`], [`AllocationEngine`]
//! and [`QueryFacade`] — share a storage backend and a clock. Every operation
//! that touches a ticket type's counters is a single atomic action in the
//! store, so the engine stays correct under arbitrarily interleaved callers.

pub mod allocation;
pub mod attendance;
pub mod clock;
pub mod error;
pub mod ledger;
pub mod query;
pub mod reservations;

pub use allocation::AllocationEngine;
pub use attendance::Attendance;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::InventoryError;
pub use ledger::{Availability, Ledger};
pub use query::{AttendeeRecord, QueryFacade, TicketDetail, TicketTypeAvailability};
pub use reservations::{HoldPolicy, ReservationManager};
