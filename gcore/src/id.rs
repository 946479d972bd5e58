use serde::Deserialize;

pub use bson::oid::Error as IdError;
/// Native file identifier, the 12 byte document store id.
pub use bson::oid::ObjectId;

/// An identifier as handed in by a caller, either text or an already typed id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdInput {
    Raw(String),
    Typed(ObjectId),
}

impl IdInput {
    /// Converts into the native key, the only place text ids get parsed.
    pub fn resolve(&self) -> Result<ObjectId, IdError> {
        match self {
            IdInput::Raw(text) => ObjectId::parse_str(text.trim()),
            IdInput::Typed(id) => Ok(*id),
        }
    }
}

impl From<ObjectId> for IdInput {
    fn from(id: ObjectId) -> Self {
        IdInput::Typed(id)
    }
}

impl From<&str> for IdInput {
    fn from(text: &str) -> Self {
        IdInput::Raw(text.to_string())
    }
}

impl From<String> for IdInput {
    fn from(text: String) -> Self {
        IdInput::Raw(text)
    }
}
