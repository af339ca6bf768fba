//! Session login.
//!
//! A plain credential table gates the start of a session. There is no
//! hashing, lockout or rate limiting; the table only decides which identity
//! the audit logs are attributed to.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{BufRead, Write};

use anyhow::{anyhow, Result};

use crate::error::Error;

/// The authenticated operator a session's events are attributed to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug)]
pub struct CredentialStore {
    users: BTreeMap<String, String>,
}

impl CredentialStore {
    pub fn new(users: BTreeMap<String, String>) -> Self {
        Self { users }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn verify(&self, username: &str, password: &str) -> std::result::Result<Identity, Error> {
        match self.users.get(username) {
            Some(expected) if expected == password => Ok(Identity::new(username)),
            _ => Err(Error::Auth {
                username: username.to_string(),
            }),
        }
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new(default_users())
    }
}

pub fn default_users() -> BTreeMap<String, String> {
    BTreeMap::from([("admin".to_string(), "1234".to_string())])
}

/// Prompt for username and password until a pair matches.
///
/// Fails only when the input closes before a successful login.
pub fn prompt_login<R: BufRead, W: Write>(
    store: &CredentialStore,
    input: &mut R,
    output: &mut W,
) -> Result<Identity> {
    loop {
        writeln!(output, "Enter Username:")?;
        output.flush()?;
        let username = read_field(input)?;
        writeln!(output, "Enter Password:")?;
        output.flush()?;
        let password = read_field(input)?;

        match store.verify(&username, &password) {
            Ok(identity) => {
                writeln!(output, "Login successful!\n")?;
                return Ok(identity);
            }
            Err(err) => {
                log::warn!("{}", err);
                writeln!(output, "Invalid username or password. Try again.\n")?;
            }
        }
    }
}

fn read_field<R: BufRead>(input: &mut R) -> Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(anyhow!("input closed before login completed"));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn default_table_accepts_admin() {
        let store = CredentialStore::default();
        assert_eq!(store.verify("admin", "1234").unwrap(), Identity::new("admin"));
        assert!(matches!(
            store.verify("admin", "4321"),
            Err(Error::Auth { .. })
        ));
        assert!(store.verify("guest", "1234").is_err());
    }

    #[test]
    fn prompt_reprompts_until_success() -> Result<()> {
        let store = CredentialStore::default();
        let mut input = Cursor::new("admin\nwrong\nnobody\n1234\nadmin\n1234\n");
        let mut output = Vec::new();

        let identity = prompt_login(&store, &mut input, &mut output)?;
        assert_eq!(identity.as_str(), "admin");

        let transcript = String::from_utf8(output)?;
        assert_eq!(transcript.matches("Try again").count(), 2);
        assert_eq!(transcript.matches("Enter Username:").count(), 3);
        assert!(transcript.ends_with("Login successful!\n\n"));
        Ok(())
    }

    #[test]
    fn prompt_fails_when_input_closes() {
        let store = CredentialStore::default();
        let mut input = Cursor::new("admin\n");
        let mut output = Vec::new();
        assert!(prompt_login(&store, &mut input, &mut output).is_err());
    }

    #[test]
    fn passwords_keep_inner_whitespace() {
        let store = CredentialStore::new(BTreeMap::from([(
            "ops".to_string(),
            "two words".to_string(),
        )]));
        let mut input = Cursor::new("ops\r\ntwo words\r\n");
        let mut output = Vec::new();
        let identity = prompt_login(&store, &mut input, &mut output).unwrap();
        assert_eq!(identity, Identity::new("ops"));
    }
}
