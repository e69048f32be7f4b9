//! Local user accounts

use md5::{Digest, Md5};

use crate::error::CompileError;
use crate::parser::{Map, Value};
use crate::stamp::{rename_block, Kind, Output, Render, Scope};

pub(crate) const USER_MODERN: &str = r#"
auth user $name {
    encrypted-password none
    description none
    shell none
    role admin
    partition-access all
}
"#;

pub(crate) const USER_LEGACY: &str = r#"
user $name {
    description a
    shell "/bin/false"
}
"#;

const SALT: &str = "fakesalt";

const CRYPT_ALPHABET: &[u8; 64] = b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Role names of the flat syntax, where they differ
fn legacy_role(role: &str) -> &str {
    match role {
        "admin" => "administrator",
        "application-editor" => "app editor",
        "no-access" => "none",
        "web-application-security-editor" => "policy editor",
        "resource-admin" => "resource admin",
        "user-manager" => "user manager",
        other => other,
    }
}

/// MD5-based `crypt(3)` hash (`$1$salt$...`), as stored by the device.
/// The salt may carry the `$1$` prefix and is cut to 8 characters.
pub fn md5_crypt(password: &str, salt: &str) -> String {
    const MAGIC: &str = "$1$";

    let salt = salt.strip_prefix(MAGIC).unwrap_or(salt);
    let salt = salt.split('$').next().unwrap_or_default();
    let salt = match salt.char_indices().nth(8) {
        Some((end, _)) => &salt[..end],
        None => salt,
    };
    let pw = password.as_bytes();

    let mut alternate = Md5::new();
    alternate.update(pw);
    alternate.update(salt);
    alternate.update(pw);
    let alternate = alternate.finalize();

    let mut ctx = Md5::new();
    ctx.update(pw);
    ctx.update(MAGIC);
    ctx.update(salt);
    for chunk in pw.chunks(16) {
        ctx.update(&alternate[..chunk.len()]);
    }
    let mut bits = pw.len();
    while bits != 0 {
        if bits & 1 != 0 {
            ctx.update([0u8]);
        } else {
            ctx.update(&pw[..1]);
        }
        bits >>= 1;
    }
    let mut digest = ctx.finalize();

    for round in 0..1000 {
        let mut ctx = Md5::new();
        if round & 1 != 0 {
            ctx.update(pw);
        } else {
            ctx.update(digest.as_slice());
        }
        if round % 3 != 0 {
            ctx.update(salt);
        }
        if round % 7 != 0 {
            ctx.update(pw);
        }
        if round & 1 != 0 {
            ctx.update(digest.as_slice());
        } else {
            ctx.update(pw);
        }
        digest = ctx.finalize();
    }

    let mut out = format!("{}{}$", MAGIC, salt);
    let mut push = |value: u32, count: usize| {
        let mut value = value;
        for _ in 0..count {
            out.push(char::from(CRYPT_ALPHABET[(value & 0x3f) as usize]));
            value >>= 6;
        }
    };
    for (a, b, c) in [(0, 6, 12), (1, 7, 13), (2, 8, 14), (3, 9, 15), (4, 10, 5)] {
        let value = u32::from(digest[a]) << 16 | u32::from(digest[b]) << 8 | u32::from(digest[c]);
        push(value, 4);
    }
    push(u32::from(digest[11]), 2);
    out
}

#[derive(Debug, Clone)]
pub struct User {
    pub name: String,
    /// Defaults to the user name
    pub password: String,
    pub role: String,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            password: name.clone(),
            name,
            role: "admin".to_string(),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    fn description(&self) -> String {
        format!("User {}/{}", self.name, self.password)
    }
}

impl Render for User {
    fn kind(&self) -> Kind {
        Kind::User
    }

    fn modern(&self, scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        let key = scope.path(&self.name);
        let value = rename_block(self.kind(), &mut template, &["auth", "user", "$name"], &self.name)?;
        value.insert("encrypted-password", md5_crypt(&self.password, SALT));
        value.insert("role", self.role.as_str());
        value.insert("description", self.description());
        Ok((Some(key), Some(template)))
    }

    fn legacy(&self, _scope: &Scope<'_>, mut template: Map) -> Result<Output, CompileError> {
        let value = rename_block(self.kind(), &mut template, &["user", "$name"], &self.name)?;
        value.insert("password crypt", md5_crypt(&self.password, SALT));
        value.insert("role", Value::raw(format!("{} in all", legacy_role(&self.role))));
        value.insert("description", self.description());
        Ok((Some(self.name.clone()), Some(template)))
    }
}
