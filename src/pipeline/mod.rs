//! Mail sorting pipeline.
//!
//! Every unread message in the shared inbox flows through:
//! 1. `MailTransport::list_unread_messages()`: mailbox I/O
//! 2. `rules::explain()`: ordered keyword and attachment heuristics
//! 3. `LogSink::record()`: one decision row per message
//! 4. `MailTransport::move_message()`: file into the category folder
//!
//! The drafter reuses steps 1 and 2 to find a purchase order and sends a fixed
//! acknowledgement through a `DraftSender`.

pub mod drafter;
pub mod rules;
pub mod sorter;
pub mod types;

pub use drafter::PoDrafter;
pub use sorter::EmailSorter;
