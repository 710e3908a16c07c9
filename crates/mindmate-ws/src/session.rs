use mindmate_core::events::channel_name;
use uuid::Uuid;

/// One admitted connection, bound to a single identity.
pub struct Session {
    pub identity: i64,
    pub connection_id: Uuid,
    pub channel: String,
}

impl Session {
    pub fn new(identity: i64) -> Self {
        Self {
            identity,
            connection_id: Uuid::new_v4(),
            channel: channel_name(identity),
        }
    }
}
