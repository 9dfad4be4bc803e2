pub mod event;
pub mod external_event;
pub mod ticket;
pub mod user;

pub use event::{Event, EventPatch, EventStats, NewEvent};
pub use external_event::ExternalEvent;
pub use ticket::{NewTicket, Ticket, TicketPatch, TicketPurchase, TicketStatus};
pub use user::{NewUser, User, UserPatch};
