use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Message {
    pub success: bool,
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Message {
            success: true,
            message: message.into(),
        }
    }
}
