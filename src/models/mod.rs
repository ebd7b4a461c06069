pub mod event;
pub mod order;
pub mod reservation;
pub mod ticket;

pub use event::Event;
pub use order::{Order, OrderLine, OrderStatus};
pub use reservation::{Reservation, ReservationState};
pub use ticket::{Ticket, TicketType};
