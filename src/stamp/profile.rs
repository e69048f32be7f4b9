//! Built-in traffic profiles referenced by virtual servers

use serde::Deserialize;

use crate::stamp::{Kind, Render};

/// Which side of the proxy a profile applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileContext {
    #[default]
    All,
    ClientSide,
    ServerSide,
}

impl ProfileContext {
    pub fn name(self) -> &'static str {
        match self {
            ProfileContext::All => "all",
            ProfileContext::ClientSide => "clientside",
            ProfileContext::ServerSide => "serverside",
        }
    }
}

/// A profile that ships with the device. Never rendered itself; virtual
/// servers refer to it by path or name.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub context: ProfileContext,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            context: ProfileContext::All,
        }
    }

    pub fn with_context(mut self, context: ProfileContext) -> Self {
        self.context = context;
        self
    }
}

impl Render for Profile {
    fn kind(&self) -> Kind {
        Kind::Profile
    }

    fn built_in(&self) -> bool {
        true
    }
}
