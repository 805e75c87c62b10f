//! Well-known KV key shapes (spec §3). Centralized so every module agrees
//! on the same layout instead of hand-formatting strings at call sites.

use kv_store::Key;

pub fn client_record(id: &str) -> Key {
    Key::new(["clients", id])
}

pub fn clients_prefix() -> Key {
    Key::new(["clients"])
}

pub fn controller_directory_entry(id: &str) -> Key {
    Key::new(["controllers", id])
}

pub fn controllers_prefix() -> Key {
    Key::new(["controllers"])
}

pub fn queued_message(recipient_id: &str, message_ulid: &str) -> Key {
    Key::new(["messages", recipient_id, message_ulid])
}

pub fn messages_prefix(recipient_id: &str) -> Key {
    Key::new(["messages", recipient_id])
}

/// Single canonical leadership key — spec §9 open question #1: the source's
/// duplicated legacy keys are collapsed into this one.
pub fn active_controller() -> Key {
    Key::new(["leadership", "active-controller"])
}

pub fn change_notification() -> Key {
    Key::new(["leadership", "change-notification"])
}
